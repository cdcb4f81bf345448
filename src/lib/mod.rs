/*
pmrecovery library & toolset
Copyright (C) 2018 Steve Muller <steve.muller@outlook.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

//! Recovers a plain file tree from a PaperMaster document cabinet.
//!
//! A cabinet stores every drawer, folder, document and page under an 8-digit
//! hexadecimal name. The human names live in a binary `_PFC._PS` file at each
//! directory level (see [`meta`]), and the pages themselves are TIFF or JPEG
//! images hidden behind a vendor header (see [`image`]).

extern crate chrono;
extern crate thiserror;
extern crate walkdir;

pub mod cabinet;
pub mod error;
pub mod ident;
pub mod image;
pub mod io;
pub mod meta;
