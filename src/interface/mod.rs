/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

pub mod i2c;

use alloc::boxed::Box;
use alloc::vec::Vec;

pub use self::i2c::I2cInterface;

/// Single-shot completion signal for a bus operation
pub type Completion<T, E> = Box<dyn FnOnce(Result<T, E>)>;

/// A method of communicating with the sensor.
///
/// Operations are requests: each must call its `done` completion exactly
/// once, either before returning or at some later time (from an
/// interrupt handler or event loop, for example). The driver issues at
/// most one request at a time.
pub trait BusTransport {
    /// Interface error type
    type Error: core::fmt::Debug;

    /// Write `bytes` to the device at 7-bit `address`
    fn send(&mut self, address: u8, bytes: &[u8], done: Completion<(), Self::Error>);

    /// Write `bytes` to the device at 7-bit `address`, then read back
    /// `read_len` bytes
    fn transfer(
        &mut self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
        done: Completion<Vec<u8>, Self::Error>,
    );
}
