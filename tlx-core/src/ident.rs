//! Composite story identifiers.
//!
//! A [`StoryId`] names one narrative unit. It is recovered from index path
//! hints, rendered into `LIKE` patterns for the index query, and into output
//! sub-paths and filenames. Every field is an opaque fixed-width string; no
//! field is ever interpreted as a number.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TlxError};
use crate::util::sanitize::sanitize_filename;

pub const SET_WIDTH: usize = 5;
pub const GROUP_WIDTH: usize = 2;
pub const ID_WIDTH: usize = 4;
pub const IDX_WIDTH: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoryKind {
    Story,
    Home,
    Lyrics,
    Preview,
}

impl StoryKind {
    pub const ALL: [StoryKind; 4] = [Self::Story, Self::Home, Self::Lyrics, Self::Preview];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Home => "home",
            Self::Lyrics => "lyrics",
            Self::Preview => "preview",
        }
    }

    /// Whether the consumer should disable automatic line wrapping.
    pub fn no_wrap(self) -> bool {
        matches!(self, Self::Home)
    }

    /// Lyrics and preview output lives directly under `<root>/<kind>/`.
    pub fn is_flat(self) -> bool {
        matches!(self, Self::Lyrics | Self::Preview)
    }
}

impl fmt::Display for StoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown story kind: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoryId {
    Story {
        group: Option<String>,
        id: Option<String>,
        idx: Option<String>,
    },
    Home {
        set: Option<String>,
        group: Option<String>,
        id: Option<String>,
        idx: Option<String>,
    },
    Lyrics {
        id: Option<String>,
    },
    Preview {
        id: Option<String>,
    },
}

impl StoryId {
    /// Build from loose field values. Fields that the kind does not carry are
    /// dropped; for lyrics/preview a lone `idx` is promoted to `id`.
    pub fn new(
        kind: StoryKind,
        set: Option<String>,
        group: Option<String>,
        id: Option<String>,
        idx: Option<String>,
    ) -> Self {
        let (set, group, id, idx) = (nonempty(set), nonempty(group), nonempty(id), nonempty(idx));
        match kind {
            StoryKind::Story => Self::Story { group, id, idx },
            StoryKind::Home => Self::Home {
                set,
                group,
                id,
                idx,
            },
            StoryKind::Lyrics => Self::Lyrics { id: id.or(idx) },
            StoryKind::Preview => Self::Preview { id: id.or(idx) },
        }
    }

    /// An identifier with no narrowing fields: matches every unit of `kind`.
    pub fn any(kind: StoryKind) -> Self {
        Self::new(kind, None, None, None, None)
    }

    pub fn kind(&self) -> StoryKind {
        match self {
            Self::Story { .. } => StoryKind::Story,
            Self::Home { .. } => StoryKind::Home,
            Self::Lyrics { .. } => StoryKind::Lyrics,
            Self::Preview { .. } => StoryKind::Preview,
        }
    }

    pub fn set(&self) -> Option<&str> {
        match self {
            Self::Home { set, .. } => set.as_deref(),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Story { group, .. } | Self::Home { group, .. } => group.as_deref(),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Story { id, .. }
            | Self::Home { id, .. }
            | Self::Lyrics { id }
            | Self::Preview { id } => id.as_deref(),
        }
    }

    pub fn idx(&self) -> Option<&str> {
        match self {
            Self::Story { idx, .. } | Self::Home { idx, .. } => idx.as_deref(),
            _ => None,
        }
    }

    /// Parse a composite token such as `"040012001"` (story) or
    /// `"00001010001001"` (home).
    ///
    /// Fields are byte-positional, so non-ASCII tokens are rejected rather
    /// than sliced into partial wildcards.
    pub fn parse(kind: StoryKind, token: &str) -> Result<Self> {
        if !token.is_ascii() {
            return Err(TlxError::InvalidToken {
                kind,
                token: token.to_owned(),
            });
        }
        let part = |start: usize, end: Option<usize>| -> Option<String> {
            let end = end.unwrap_or(token.len()).min(token.len());
            token.get(start.min(end)..end).map(str::to_owned)
        };
        let id = match kind {
            StoryKind::Lyrics | StoryKind::Preview => {
                Self::new(kind, None, None, Some(token.to_owned()), None)
            }
            StoryKind::Home if token.len() > 9 => Self::new(
                kind,
                part(0, Some(5)),
                part(5, Some(7)),
                part(7, Some(11)),
                part(11, None),
            ),
            _ => Self::new(kind, None, part(0, Some(2)), part(2, Some(6)), part(6, None)),
        };
        Ok(id)
    }

    /// Recover the identifier embedded in the tail of an index path hint.
    pub fn from_path_hint(kind: StoryKind, hint: &str) -> Result<Self> {
        let too_short = || TlxError::PathHintTooShort {
            kind,
            hint: hint.to_owned(),
        };
        let tail = |n: usize| tail_of(hint, n).ok_or_else(too_short);
        let field = |s: &str, a: usize, b: usize| -> Result<String> {
            s.get(a..b).map(str::to_owned).ok_or_else(too_short)
        };

        let id = match kind {
            StoryKind::Home => {
                let t = tail(16)?;
                Self::Home {
                    set: Some(field(t, 0, 5)?),
                    group: Some(field(t, 6, 8)?),
                    id: Some(field(t, 9, 13)?),
                    idx: Some(field(t, 13, 16)?),
                }
            }
            StoryKind::Lyrics => Self::Lyrics {
                id: Some(field(tail(11)?, 0, 4)?),
            },
            StoryKind::Preview => Self::Preview {
                id: Some(tail(4)?.to_owned()),
            },
            StoryKind::Story => {
                let t = tail(9)?;
                Self::Story {
                    group: Some(field(t, 0, 2)?),
                    id: Some(field(t, 2, 6)?),
                    idx: Some(field(t, 6, 9)?),
                }
            }
        };
        Ok(id)
    }

    /// Fill every unset field with a same-width `_` wildcard.
    pub fn queryfy(&self) -> Self {
        let fill = |f: &Option<String>, width: usize| -> Option<String> {
            Some(f.clone().unwrap_or_else(|| "_".repeat(width)))
        };
        match self {
            Self::Story { group, id, idx } => Self::Story {
                group: fill(group, GROUP_WIDTH),
                id: fill(id, ID_WIDTH),
                idx: fill(idx, IDX_WIDTH),
            },
            Self::Home {
                set,
                group,
                id,
                idx,
            } => Self::Home {
                set: fill(set, SET_WIDTH),
                group: fill(group, GROUP_WIDTH),
                id: fill(id, ID_WIDTH),
                idx: fill(idx, IDX_WIDTH),
            },
            Self::Lyrics { id } => Self::Lyrics {
                id: fill(id, ID_WIDTH),
            },
            Self::Preview { id } => Self::Preview {
                id: fill(id, ID_WIDTH),
            },
        }
    }

    /// `LIKE` pattern matching the index path hints of this identifier.
    pub fn query_pattern(&self) -> String {
        let q = self.queryfy();
        let (set, group, id, idx) = (
            q.set().unwrap_or_default(),
            q.group().unwrap_or_default(),
            q.id().unwrap_or_default(),
            q.idx().unwrap_or_default(),
        );
        match &q {
            Self::Story { .. } => format!("story/data/{group}/{id}/storytimeline%{idx}"),
            Self::Home { .. } => {
                format!("home/data/{set}/{group}/hometimeline_{set}_{group}_{id}{idx}%")
            }
            Self::Lyrics { .. } => format!("live/musicscores/m{id}/m{id}_lyrics"),
            Self::Preview { .. } => {
                format!("outgame/announceevent/loguiasset/ast_announce_event_log_ui_asset_0{id}")
            }
        }
    }

    /// Output filename; preview embeds the sanitized title when present.
    pub fn filename(&self, title: &str) -> String {
        let (set, group, id, idx) = (
            self.set().unwrap_or_default(),
            self.group().unwrap_or_default(),
            self.id().unwrap_or_default(),
            self.idx().unwrap_or_default(),
        );
        match self {
            Self::Story { .. } => format!("storytimeline_{self}.json"),
            Self::Home { .. } => format!("hometimeline_{set}_{group}_{id}{idx}.json"),
            Self::Lyrics { .. } => format!("{id}.json"),
            Self::Preview { .. } => {
                let title = sanitize_filename(title);
                if title.is_empty() {
                    format!("{id}.json")
                } else {
                    format!("{id} ({title}).json")
                }
            }
        }
    }

    /// Prefix shared by every output filename of this identifier, used to
    /// detect existing output when the full name depends on decoded content.
    pub fn filename_stem(&self) -> String {
        match self {
            Self::Lyrics { .. } | Self::Preview { .. } => self.id().unwrap_or_default().to_owned(),
            _ => self.filename("").trim_end_matches(".json").to_owned(),
        }
    }

    /// Nested `set/group/id` directories; empty for flat kinds.
    pub fn sub_path(&self) -> PathBuf {
        if self.kind().is_flat() {
            return PathBuf::new();
        }
        [self.set(), self.group(), self.id()]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [self.set(), self.group(), self.id(), self.idx()]
            .into_iter()
            .flatten()
        {
            f.write_str(part)?;
        }
        Ok(())
    }
}

fn tail_of(s: &str, n: usize) -> Option<&str> {
    s.len().checked_sub(n).and_then(|start| s.get(start..))
}

fn nonempty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}
