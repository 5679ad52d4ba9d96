/// Rotation offset a fresh channel starts from.
pub const INITIAL_IMAGE_INDEX: i64 = 20;

/// Per-channel game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub channel_id: String,
    pub bird: String,
    pub answered: bool,
    pub song_bird: String,
    pub song_answered: bool,
    pub goatsucker: String,
    pub goatsucker_answered: bool,
    pub total_correct: i64,
    pub prev_bird: String,
    pub prev_song: String,
    pub prev_image_index: i64,
}

impl ChannelState {
    pub fn new(channel_id: String) -> Self {
        Self {
            channel_id,
            bird: String::new(),
            answered: true,
            song_bird: String::new(),
            song_answered: true,
            goatsucker: String::new(),
            goatsucker_answered: true,
            total_correct: 0,
            prev_bird: String::new(),
            prev_song: String::new(),
            prev_image_index: INITIAL_IMAGE_INDEX,
        }
    }
}

/// A single named field of [`ChannelState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelField {
    Bird,
    Answered,
    SongBird,
    SongAnswered,
    Goatsucker,
    GoatsuckerAnswered,
    TotalCorrect,
    PrevBird,
    PrevSong,
    PrevImageIndex,
}

impl ChannelField {
    /// Column backing this field in the `channel_state` table.
    pub fn column(&self) -> &'static str {
        match self {
            ChannelField::Bird => "bird",
            ChannelField::Answered => "answered",
            ChannelField::SongBird => "song_bird",
            ChannelField::SongAnswered => "song_answered",
            ChannelField::Goatsucker => "goatsucker",
            ChannelField::GoatsuckerAnswered => "goatsucker_answered",
            ChannelField::TotalCorrect => "total_correct",
            ChannelField::PrevBird => "prev_bird",
            ChannelField::PrevSong => "prev_song",
            ChannelField::PrevImageIndex => "prev_image_index",
        }
    }
}
