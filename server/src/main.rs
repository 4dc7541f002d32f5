/*
 * This file is a part of the Patricia project
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # Patricia
//!
//! `patriciad` is an in-memory, ordered key/value store served over a
//! small binary TCP protocol (spec §6), built around a compressed radix
//! trie (`engine::idx`) and a cooperative task scheduler (`rt`) that
//! drives per-connection parsing and dispatch (`proto`, `net`) without
//! blocking threads.

mod buf;
mod config;
mod engine;
mod error;
mod net;
mod proto;
mod rt;

use env_logger::Builder;
use libwood::util::terminal;
use std::env;
use std::process;
use std::rc::Rc;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
use jemallocator::Jemalloc;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const ENV_LOG: &str = "PATRICIA_LOG";

fn main() {
    Builder::new()
        .parse_filters(&env::var(ENV_LOG).unwrap_or_else(|_| "info".to_owned()))
        .init();

    println!("patriciad v{} | {}", libwood::VERSION, libwood::URL);

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            terminal::write_error(format_args!("configuration error: {e}\n")).ok();
            process::exit(1);
        }
    };

    log::info!("starting patriciad on {}:{}", cfg.host, cfg.port);

    let storage = Rc::new(engine::Storage::new());

    if let Err(e) = net::run(&cfg, storage) {
        log::error!("fatal error: {e}");
        terminal::write_error(format_args!("fatal error: {e}\n")).ok();
        process::exit(1);
    }

    terminal::write_info("patriciad shut down cleanly\n").ok();
}
