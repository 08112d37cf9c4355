//! # Audio Module
//!
//! Per-guild playback for Open Jukebox.
//!
//! ## Architecture
//!
//! ### [`session`] - Playback Session
//! - One actor task per guild owning the queue, the current track, the loop
//!   flag and the voice connection
//! - Commands and stream-end notifications share one mailbox, so every state
//!   transition is serialized
//!
//! ### [`registry`] - Session Registry
//! - Lazily creates one session per guild
//!
//! ### [`queue`] - Queue Management
//! - FIFO queue with a configurable cap and Fisher–Yates shuffle
//!
//! ### [`sink`] / [`voice`] - Audio Output
//! - Backend contracts and their Songbird implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # async fn example(registry: &SessionRegistry, track: Track) -> Result<(), PlaybackError> {
//! let session = registry.get_or_create(GuildId::new(123456789));
//!
//! session.join(Some(ChannelId::new(987654321))).await?;
//! session.enqueue(track).await?;
//! session.pause().await?;
//! session.resume().await?;
//! session.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod queue;
pub mod registry;
pub mod session;
pub mod sink;
pub mod track;
pub mod voice;

pub use error::PlaybackError;
pub use registry::SessionRegistry;
pub use session::{
    Announcement, EnqueueOutcome, JoinOutcome, PlaybackSession, PlaybackState, SessionOptions,
    StopSummary, MAX_VOLUME,
};
pub use track::Track;
