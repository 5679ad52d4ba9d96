use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Image file extensions that can be sent to a channel.
pub const VALID_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

/// Upload limit of the chat platform, in bytes.
pub const MAX_FILE_SIZE: u64 = 8_000_000;

/// Catalog page size. Leaves headroom for urls that 476 while still being processed.
pub const CATALOG_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    #[default]
    Default,
    Female,
    Juvenile,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Default, Variant::Female, Variant::Juvenile];

    /// Suffix appended to the species name for the cache directory.
    pub fn suffix(&self) -> &'static str {
        match self {
            Variant::Default => "",
            Variant::Female => "female",
            Variant::Juvenile => "juvenile",
        }
    }

    pub fn sex(&self) -> Sex {
        match self {
            Variant::Female => Sex::Female,
            _ => Sex::Any,
        }
    }

    pub fn age(&self) -> Age {
        match self {
            Variant::Juvenile => Age::Juvenile,
            _ => Age::Any,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Default => f.write_str("default"),
            other => f.write_str(other.suffix()),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" => Ok(Variant::Default),
            "female" => Ok(Variant::Female),
            "juvenile" => Ok(Variant::Juvenile),
            other => Err(format!("unknown variant: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Photo,
    Audio,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Photo => "p",
            MediaType::Audio => "a",
            MediaType::Video => "v",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaType::Photo => MediaKind::Image,
            MediaType::Audio => MediaKind::Song,
            MediaType::Video => MediaKind::Video,
        }
    }
}

/// What the user asked for, used in log lines and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Song,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Image => "image",
            MediaKind::Song => "song",
            MediaKind::Video => "video",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sex {
    #[default]
    Any,
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Any => "",
            Sex::Male => "m",
            Sex::Female => "f",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Age {
    #[default]
    Any,
    Adult,
    Juvenile,
    Immature, // very few pictures on the provider side
}

impl Age {
    pub fn as_str(&self) -> &'static str {
        match self {
            Age::Any => "",
            Age::Adult => "a",
            Age::Juvenile => "j",
            Age::Immature => "i",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundType {
    #[default]
    Any,
    Song,
    Call,
}

impl SoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::Any => "",
            SoundType::Song => "s",
            SoundType::Call => "c",
        }
    }
}

/// Catalog filters for a single listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaQuery {
    pub media_type: MediaType,
    pub sex: Sex,
    pub age: Age,
    pub sound_type: SoundType,
}

impl MediaQuery {
    pub fn photos(variant: Variant) -> Self {
        Self {
            media_type: MediaType::Photo,
            sex: variant.sex(),
            age: variant.age(),
            sound_type: SoundType::Any,
        }
    }

    pub fn audio(sound_type: SoundType) -> Self {
        Self {
            media_type: MediaType::Audio,
            sex: Sex::Any,
            age: Age::Any,
            sound_type,
        }
    }
}

/// A local file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub extension: String,
}

impl DownloadedFile {
    pub fn new(path: PathBuf) -> Self {
        let extension = file_extension(&path);
        Self { path, extension }
    }

    /// Name to send the file under so the real filename doesn't spoil the answer.
    pub fn upload_name(&self) -> String {
        format!("bird.{}", self.extension)
    }
}

/// Everything after the last dot of the file name, or an empty string.
pub fn file_extension(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string()
}

pub fn is_valid_extension(extension: &str) -> bool {
    let lower = extension.to_lowercase();
    VALID_EXTENSIONS.contains(&lower.as_str())
}
