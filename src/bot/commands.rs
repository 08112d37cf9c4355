use crate::audio::MAX_VOLUME;

const VOLUME_USAGE: &str = "volume <0-100>";

/// Prefix commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play(String),
    Pause,
    Resume,
    Skip,
    Stop,
    Loop,
    Shuffle,
    Queue,
    NowPlaying,
    Volume(u8),
    /// `volume` with a number outside `0..=100`.
    VolumeOutOfRange(i64),
    Help,
    /// Known command with missing arguments; carries the usage line.
    Invalid(&'static str),
}

impl Command {
    /// Parsea un mensaje. Devuelve `None` si no es un comando del bot.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let body = content.trim_start().strip_prefix(prefix)?;
        let mut parts = body.trim().splitn(2, char::is_whitespace);
        let name = parts.next()?.to_lowercase();
        let args = parts.next().unwrap_or("").trim();

        let command = match name.as_str() {
            "join" | "summon" => Self::Join,
            "leave" | "disconnect" => Self::Leave,
            "play" | "p" if args.is_empty() => Self::Invalid("play <query>"),
            "play" | "p" => Self::Play(args.to_string()),
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "skip" => Self::Skip,
            "stop" => Self::Stop,
            "loop" => Self::Loop,
            "shuffle" => Self::Shuffle,
            "queue" | "q" => Self::Queue,
            "nowplaying" | "np" => Self::NowPlaying,
            "volume" | "vol" => match args.parse::<i64>() {
                Ok(volume) => match u8::try_from(volume) {
                    Ok(volume) if volume <= MAX_VOLUME => Self::Volume(volume),
                    _ => Self::VolumeOutOfRange(volume),
                },
                Err(_) => Self::Invalid(VOLUME_USAGE),
            },
            "help" => Self::Help,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Play(_) => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Loop => "loop",
            Self::Shuffle => "shuffle",
            Self::Queue => "queue",
            Self::NowPlaying => "nowplaying",
            Self::Volume(_) | Self::VolumeOutOfRange(_) => "volume",
            Self::Help => "help",
            Self::Invalid(_) => "invalid",
        }
    }
}
