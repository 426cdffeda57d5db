use serde::{Deserialize, Serialize};

/// Normalized narrative text of one story unit, as written to disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: String,
    pub no_wrap: bool,
    #[serde(rename = "text_block_list")]
    pub text_blocks: Vec<TextBlock>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub name: String,
    pub text: String,
    #[serde(
        rename = "choice_data_list",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub choices: Vec<String>,
}

impl TextBlock {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            choices: Vec::new(),
        }
    }
}

impl ExtractedRecord {
    pub fn new(title: impl Into<String>, no_wrap: bool) -> Self {
        Self {
            title: title.into(),
            no_wrap,
            text_blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty()
    }
}
