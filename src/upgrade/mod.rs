//! Self-update for VideoDownloaderPro.
//!
//! The running application cannot replace its own executable, so an update is
//! split across two cooperating processes:
//!
//! - the **primary** (`vdpro`) checks the version manifest, downloads the new
//!   binary to `<executable>.new`, launches the updater and exits;
//! - the **updater** (`vdpro-updater`) waits until the old executable can be
//!   removed, moves the staged binary into place and relaunches it.
//!
//! The only thing the two processes share is the updater's command line:
//! `vdpro-updater <OLD_EXE> <NEW_EXE>`.
//!
//! # Update Process Flow
//!
//! ```text
//! primary                                  updater
//! ───────                                  ───────
//! 1. Version check (manifest, ?t=<ts>)
//! 2. Download to <exe>.new, verify
//! 3. Copy updater to temp dir
//! 4. Launch updater detached ───────────▶ 5. Retry deleting <exe>
//!    exit(0)                               6. Move <exe>.new → <exe>
//!                                          7. Relaunch <exe>, exit
//! ```
//!
//! # Module Structure
//!
//! - [`manifest`]: Version manifest fetch and semantic version comparison
//! - [`session`]: The in-process record of one update attempt
//! - [`download`]: Streaming download into the staging file
//! - [`verification`]: SHA-256 check of the staged file
//! - [`handoff`]: Locating, copying and launching the updater
//! - [`installer`]: The updater's state machine
//! - [`lock`]: Cross-process update lock
//! - [`context`]: Where the installed executable lives
//! - [`observer`]: Progress, completion and error callbacks
//! - [`config`]: The `[upgrade]` configuration table
//! - [`self_updater`]: Orchestration of the primary's side
//!
//! # Failure Policy
//!
//! A failed version check is indistinguishable from "no update" for the
//! caller (it is logged). Download and handoff failures are reported through
//! [`UpdateObserver::on_error`] and remove the staging file. Updater failures
//! end the updater with exit code 1.

pub mod config;
pub mod context;
pub mod download;
pub mod handoff;
pub mod installer;
pub mod lock;
pub mod manifest;
pub mod observer;
pub mod self_updater;
pub mod session;
pub mod verification;


pub use context::InstallContext;
pub use download::DownloadTask;
pub use handoff::{UpdaterHandoff, locate_updater};
pub use installer::{ConsoleStatus, InstallFs, Installer, InstallerState, StatusDisplay, StdFs};
pub use lock::UpdateLock;
pub use manifest::{ManifestFetcher, UpdateCheck, VersionManifest, is_newer, parse_version};
pub use observer::{ChannelObserver, NoopObserver, UpdateEvent, UpdateObserver};
pub use self_updater::{SelfUpdater, StagedUpdate};
pub use session::{SessionState, UpdateSession};
pub use verification::ChecksumVerifier;
