use serde::{Serialize, Deserialize};
use strum::AsRefStr as StrumAsRefStr;

/// kind of entry in a disk's file tree
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    StrumAsRefStr,
    Serialize, Deserialize
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    Folder,
    Document,
    Picture,
    Audio,
    Video,
    Url,
    Note,
    Other,
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

const DOCUMENT_SUBTYPES: [&str; 8] = [
    "pdf",
    "msword",
    "rtf",
    "json",
    "xml",
    "vnd.openxmlformats-officedocument.wordprocessingml.document",
    "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "vnd.openxmlformats-officedocument.presentationml.presentation",
];

impl FileType {
    /// guesses the type of an uploaded file from the extension of its name
    pub fn from_name(name: &str) -> FileType {
        let Some(guess) = mime_guess::from_path(name).first() else {
            return FileType::Other;
        };

        Self::from_mime(&guess)
    }

    pub fn from_mime(mime: &mime::Mime) -> FileType {
        let top = mime.type_();

        if top == mime::IMAGE {
            FileType::Picture
        } else if top == mime::AUDIO {
            FileType::Audio
        } else if top == mime::VIDEO {
            FileType::Video
        } else if top == mime::TEXT {
            FileType::Document
        } else if top == mime::APPLICATION {
            let subtype = mime.subtype().as_str();

            if DOCUMENT_SUBTYPES.contains(&subtype) || subtype.starts_with("vnd.ms-") {
                FileType::Document
            } else {
                FileType::Other
            }
        } else {
            FileType::Other
        }
    }

    /// types that occupy space on a disk. folders and links do not.
    pub fn is_size_bearing(&self) -> bool {
        !matches!(self, FileType::Folder | FileType::Url)
    }
}
