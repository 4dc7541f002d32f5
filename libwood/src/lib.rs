/*
 * This file is a part of the Patricia project
 *
 * Patricia is an in-memory, ordered key/value store served over a small
 * binary TCP protocol, built around a compressed radix trie and a
 * cooperative task scheduler.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The core library for Patricia
//!
//! This contains small, dependency-light pieces shared by the server binary:
//! a generic error-boxing result type, version/URL constants used in startup
//! banners, and terminal colour helpers.

pub mod util;

use std::error::Error;

/// A generic result used for startup/bootstrap code where a single boxed
/// error is good enough (the hot path uses the crate's own `Error` type).
pub type TResult<T> = Result<T, Box<dyn Error>>;

/// The default size of a connection's inbound read chunk, in bytes.
pub const BUF_CAP: usize = 1024;

/// Crate version, surfaced in the startup banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Project URL, surfaced in the startup banner.
pub const URL: &str = "https://github.com/patricia-db/patricia";
