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

use std::collections::VecDeque;

/// The most recent `capacity` bytes of a stream. Older bytes fall out at the front.
pub struct Window {
	bytes: VecDeque<u8>,
	capacity: usize,
}

impl Window {
	pub fn new(capacity: usize) -> Window {
		Window { bytes: VecDeque::with_capacity(capacity), capacity }
	}

	pub fn push(&mut self, byte: u8) {
		if self.bytes.len() == self.capacity {
			self.bytes.pop_front();
		}
		self.bytes.push_back(byte);
	}

	pub fn as_slice(&mut self) -> &[u8] {
		self.bytes.make_contiguous()
	}

	/// The last `n` bytes, or `None` if fewer than `n` bytes have been pushed.
	pub fn tail(&mut self, n: usize) -> Option<&[u8]> {
		let slice = self.as_slice();
		if slice.len() < n {
			None
		}
		else {
			Some(&slice[slice.len() - n..])
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_only_the_newest_bytes() {
		let mut window = Window::new(3);
		for b in 1..=5u8 {
			window.push(b);
		}
		assert_eq!(window.as_slice(), &[3, 4, 5]);
		assert_eq!(window.tail(2), Some(&[4u8, 5][..]));
		assert_eq!(window.tail(4), None);
	}
}
