/*
 * MIT License
 *
 * Copyright (c) [2022] [Ondrej Babec <ond.babec@gmail.com>]
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! A sans-I/O MQTT 3.1.1 client protocol engine.
//!
//! This crate never performs socket I/O and never blocks. The caller owns a
//! socket (or any other byte stream), drives [`client::Client::run_once`] in
//! a loop, and feeds/drains bytes through caller-provided buffers. Every
//! suspension point - a blocked socket read/write, or a blocked application
//! payload stream - is reported back through a status bitmask so the host
//! event loop knows what to select on next.
//!
//! No heap allocation is performed anywhere in this crate.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::needless_lifetimes)]

pub mod clock;
pub mod codec;
pub mod header;
pub mod idset;
pub mod io;
pub mod pump;
pub mod store;
pub mod types;
pub mod varint;

pub mod client;

mod fmt;

pub use client::{Client, ClientEvents, RunStatus};
pub use io::{IoResult, PayloadReader, PayloadWriter, StreamError, Transport};
