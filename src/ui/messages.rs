//! Chat replies for the command dispatcher.

use serenity::model::id::ChannelId;

use crate::audio::{JoinOutcome, StopSummary};

pub const NOT_IN_VOICE: &str = "You need to be in a voice channel to summon me.";
pub const NOT_CONNECTED: &str = "I'm not in a voice channel.";
pub const NOTHING_PLAYING: &str = "No track is playing.";
pub const NOT_PAUSED: &str = "The track is not paused.";
pub const QUEUE_EMPTY: &str = "The queue is empty.";
pub const LOOKUP_FAILED: &str = "An error occurred while retrieving the track.";
pub const GUILD_ONLY: &str = "Music commands only work inside a server.";
pub const VOLUME_RANGE: &str = "Volume must be between 0 and 100.";

pub fn joined(outcome: JoinOutcome) -> String {
    match outcome {
        JoinOutcome::Joined(channel) => format!("Joined {}.", channel_mention(channel)),
        JoinOutcome::AlreadyConnected(channel) => {
            format!("I'm already connected to {}.", channel_mention(channel))
        }
    }
}

pub fn left(was_connected: bool) -> String {
    if was_connected {
        "Left the voice channel.".to_string()
    } else {
        NOT_CONNECTED.to_string()
    }
}

pub fn connection_failed(reason: &str) -> String {
    format!("Could not join the voice channel: {reason}")
}

pub fn queued(title: &str, position: Option<usize>) -> String {
    match position {
        Some(position) => format!("Queued: **{title}** (position {position})"),
        None => format!("Queued: **{title}**"),
    }
}

pub fn could_not_play(title: &str) -> String {
    format!("Could not play: **{title}**")
}

pub fn volume(percent: u8) -> String {
    format!("Volume set to {percent}%.")
}

pub fn queue_full(max: usize) -> String {
    format!("The queue is full ({max} tracks max).")
}

pub fn no_track_found(query: &str) -> String {
    format!("No track found for: {query}")
}

pub fn paused(applied: bool) -> String {
    if applied {
        "Paused the track.".to_string()
    } else {
        NOTHING_PLAYING.to_string()
    }
}

pub fn resumed(applied: bool) -> String {
    if applied {
        "Resumed the track.".to_string()
    } else {
        NOT_PAUSED.to_string()
    }
}

pub fn skipped(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("Skipped **{title}**."),
        None => NOTHING_PLAYING.to_string(),
    }
}

pub fn stopped(summary: &StopSummary) -> String {
    match (&summary.stopped, summary.cleared) {
        (None, 0) => "Nothing to stop.".to_string(),
        (_, 0) => "Stopped playback.".to_string(),
        (_, cleared) => format!("Stopped playback and cleared {cleared} queued track(s)."),
    }
}

pub fn loop_status(enabled: bool) -> String {
    format!("Looping is now {}.", if enabled { "enabled" } else { "disabled" })
}

pub fn shuffled(count: usize) -> String {
    if count == 0 {
        QUEUE_EMPTY.to_string()
    } else {
        format!("Shuffled {count} track(s).")
    }
}

pub fn queue_listing(titles: &[String]) -> String {
    if titles.is_empty() {
        return QUEUE_EMPTY.to_string();
    }

    let mut message = String::from("Upcoming tracks:\n");
    for (index, title) in titles.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", index + 1, title));
    }
    message
}

pub fn now_playing(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("Now playing: **{title}**"),
        None => "Nothing is playing currently.".to_string(),
    }
}

pub fn session_error(error: &dyn std::fmt::Display) -> String {
    format!("Something went wrong: {error}")
}

pub fn usage(prefix: &str, usage: &str) -> String {
    format!("Usage: `{prefix}{usage}`")
}

pub fn help(prefix: &str) -> String {
    [
        ("join", "Join your voice channel"),
        ("leave", "Leave the voice channel and clear the queue"),
        ("play <query>", "Search Spotify (or take a URL) and queue the track"),
        ("pause", "Pause the current track"),
        ("resume", "Resume the paused track"),
        ("skip", "Skip the current track"),
        ("stop", "Stop playback and clear the queue"),
        ("loop", "Toggle looping of the queue"),
        ("shuffle", "Shuffle the queued tracks"),
        ("queue", "Show the upcoming tracks"),
        ("nowplaying", "Show the current track"),
        ("volume <0-100>", "Set the playback volume"),
    ]
    .iter()
    .fold(String::from("**Music commands**\n"), |mut help, (name, description)| {
        help.push_str(&format!("`{prefix}{name}` - {description}\n"));
        help
    })
}

fn channel_mention(channel: ChannelId) -> String {
    format!("<#{channel}>")
}
