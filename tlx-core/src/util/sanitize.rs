/// Characters that may not appear in an output filename component.
const FORBIDDEN: [char; 9] = ['"', '*', '/', ':', '<', '>', '?', '\\', '|'];

/// Strip control characters (code points <= 31) and the forbidden set.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| (*c as u32) > 31 && !FORBIDDEN.contains(c))
        .collect()
}
