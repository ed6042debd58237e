//! Discord interface for the meetup bot.
//!
//! - **Gateway** (`gateway`) - transport seam and the reconnecting event loop
//! - **Slash Commands** (`commands`) - `/quedadas`, `/crear-quedada`, `/eliminar-quedada`,
//!   interaction commands, `/help` and `/botinfo`
//! - **Events** (`events`) - dispatch of gateway events to handlers
//! - **Embeds** (`embeds`) - response builders (embeds, join buttons, ephemeral replies)
//! - **GIFs** (`gif`) - lookup of reaction GIFs with per-kind fallbacks
//!
//! # Architecture
//!
//! ```text
//! Gateway → EventDispatcher → SlashCommandHandler → CommandRouter → MeetupRegistry
//!                                    ↓
//!                         MessageTemplate ← Response
//! ```

pub mod commands;
pub mod embeds;
pub mod events;
pub mod gateway;
pub mod gif;
