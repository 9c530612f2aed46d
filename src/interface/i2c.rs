/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

use alloc::vec;
use embedded_hal as hal;

use super::{BusTransport, Completion};
use alloc::vec::Vec;

/// Blocking embedded-hal I2C bus. Every request completes before
/// returning.
pub struct I2cInterface<I2C> {
    /// i2c port
    i2c_port: I2C,
}

impl<I2C> I2cInterface<I2C>
where
    I2C: hal::i2c::I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c_port: i2c }
    }

    /// Release owned resources
    pub fn release(self) -> I2C {
        self.i2c_port
    }
}

impl<I2C> BusTransport for I2cInterface<I2C>
where
    I2C: hal::i2c::I2c,
{
    type Error = I2C::Error;

    fn send(&mut self, address: u8, bytes: &[u8], done: Completion<(), Self::Error>) {
        done(self.i2c_port.write(address, bytes));
    }

    fn transfer(
        &mut self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
        done: Completion<Vec<u8>, Self::Error>,
    ) {
        let mut block = vec![0u8; read_len];
        let rc = self.i2c_port.write_read(address, bytes, &mut block);
        done(rc.map(|_| block));
    }
}
