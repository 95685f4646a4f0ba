use fievar::Fields;
use serde::Deserialize;

pub const FOLDER: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Deserialize, Fields)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "mimeType")]
    #[fievar(name = "mimeType")]
    pub mime_type: String,
    pub parents: Option<Vec<String>>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER
    }
}
