/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use embedded_hal as hal;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

pub mod bearing;
mod config;
mod interface;
mod queue;

pub use config::{
    AxisOrder, Config, DataRate, Gain, MeasurementBias, OperatingMode, SampleAveraging,
};
pub use interface::{BusTransport, Completion, I2cInterface};
pub use queue::{Advance, TransactionQueue};

/// Errors in this crate
#[derive(Clone, Debug, PartialEq)]
pub enum Error<CommE> {
    /// Sensor communication error
    Comm(CommE),
    /// The bus returned a different number of bytes than requested
    MalformedResponse { expected: usize, actual: usize },
}

/// Status register flags
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    /// A new measurement is waiting in the data output registers
    pub ready: bool,
    /// The data output registers are locked until all six are read
    pub lock: bool,
}

impl Status {
    const RDY: u8 = 1 << 0;
    const LOCK: u8 = 1 << 1;

    fn from_register(value: u8) -> Self {
        Self {
            ready: value & Self::RDY != 0,
            lock: value & Self::LOCK != 0,
        }
    }
}

/// One raw measurement: field strength per axis, in counts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawSample {
    /// Decode three big-endian two's complement pairs, read starting at
    /// the X MSB register
    fn decode(block: &[u8], order: AxisOrder) -> Self {
        let first = (block[0] as i16) << 8 | (block[1] as i16);
        let second = (block[2] as i16) << 8 | (block[3] as i16);
        let third = (block[4] as i16) << 8 | (block[5] as i16);

        match order {
            AxisOrder::Xzy => Self {
                x: first,
                z: second,
                y: third,
            },
            AxisOrder::Xyz => Self {
                x: first,
                y: second,
                z: third,
            },
        }
    }
}

type ReadyListener<CommE> = Box<dyn FnOnce(Result<(), &Error<CommE>>)>;

/// One-shot "configured" notification, shared with the init write tasks
struct ReadySignal<CommE> {
    /// first failure of the configuration writes, while still in progress
    init_error: Option<Error<CommE>>,
    outcome: Option<Result<(), Error<CommE>>>,
    listeners: Vec<ReadyListener<CommE>>,
}

impl<CommE> ReadySignal<CommE> {
    fn new() -> Self {
        Self {
            init_error: None,
            outcome: None,
            listeners: Vec::new(),
        }
    }
}

fn fire_ready<CommE>(signal: &RefCell<ReadySignal<CommE>>, last: Result<(), Error<CommE>>) {
    let listeners = {
        let mut signal = signal.borrow_mut();
        let outcome = match signal.init_error.take() {
            Some(err) => Err(err),
            None => last,
        };
        signal.outcome = Some(outcome);
        core::mem::take(&mut signal.listeners)
    };

    let signal = signal.borrow();
    if let Some(outcome) = &signal.outcome {
        for listener in listeners {
            listener(outcome.as_ref().map(|_| ()));
        }
    }
}

/// Check the length of a register block read
fn expect_block<CommE>(
    rc: Result<Vec<u8>, CommE>,
    expected: usize,
) -> Result<Vec<u8>, Error<CommE>> {
    let block = rc.map_err(Error::Comm)?;
    if block.len() != expected {
        return Err(Error::MalformedResponse {
            expected,
            actual: block.len(),
        });
    }
    Ok(block)
}

/// HMC5883L driver.
///
/// Every register access goes through one [`TransactionQueue`], so bus
/// transactions are issued one at a time in call order. Results are
/// delivered to the continuation passed with each request, after the
/// queue has been advanced.
pub struct Hmc5883l<B: BusTransport> {
    queue: TransactionQueue<B>,
    address: u8,
    axis_order: AxisOrder,
    high_speed: bool,
    declination: f32,
    gauss_per_lsb: f32,
    ready: Rc<RefCell<ReadySignal<B::Error>>>,
}

impl<I2C> Hmc5883l<I2cInterface<I2C>>
where
    I2C: hal::i2c::I2c + 'static,
    I2C::Error: 'static,
{
    /// Create a new driver using a blocking I2C bus
    pub fn new_i2c(i2c: I2C) -> Self {
        Self::open(I2cInterface::new(i2c))
    }

    pub fn new_i2c_with_config(i2c: I2C, config: Config) -> Self {
        Self::open_with_config(I2cInterface::new(i2c), config)
    }
}

impl<B> Hmc5883l<B>
where
    B: BusTransport + 'static,
    B::Error: 'static,
{
    /// Take ownership of the bus and start configuring the sensor with
    /// the default settings
    pub fn open(bus: B) -> Self {
        Self::open_with_config(bus, Config::default())
    }

    pub fn open_with_config(bus: B, config: Config) -> Self {
        let mut dev = Self {
            queue: TransactionQueue::new(bus),
            address: I2C_ADDRESS,
            axis_order: config.axis_order,
            high_speed: config.high_speed,
            declination: config.declination,
            gauss_per_lsb: Gain::default().scale(),
            ready: Rc::new(RefCell::new(ReadySignal::new())),
        };
        dev.initialize(&config);
        dev
    }

    /// Queue the output rate write, then the mode write. Ready fires once
    /// the mode write completes. Both writes are always issued.
    fn initialize(&mut self, config: &Config) {
        #[cfg(feature = "rttdebug")]
        rprintln!(
            "init cra 0x{:x} mode 0x{:x}",
            config.config_a(),
            config.mode_register()
        );

        let signal = self.ready.clone();
        self.write_register(Register::ConfigA, config.config_a(), move |rc| {
            if let Err(err) = rc {
                signal.borrow_mut().init_error.get_or_insert(err);
            }
        });

        let signal = self.ready.clone();
        self.write_register(Register::Mode, config.mode_register(), move |rc| {
            fire_ready(&signal, rc);
        });
    }

    /// Register a listener for the end of the configuration sequence.
    ///
    /// Receives `Ok` or the first transport error of the sequence. If the
    /// sequence already finished, the listener runs immediately.
    pub fn on_ready<F>(&mut self, listener: F)
    where
        F: FnOnce(Result<(), &Error<B::Error>>) + 'static,
    {
        let signal = self.ready.borrow();
        if let Some(outcome) = &signal.outcome {
            listener(outcome.as_ref().map(|_| ()));
            return;
        }
        drop(signal);
        self.ready.borrow_mut().listeners.push(Box::new(listener));
    }

    /// True once the configuration sequence has completed, successfully or not
    pub fn is_ready(&self) -> bool {
        self.ready.borrow().outcome.is_some()
    }

    fn write_register<F>(&mut self, reg: Register, value: u8, then: F)
    where
        F: FnOnce(Result<(), Error<B::Error>>) + 'static,
    {
        let address = self.address;
        let block = [reg as u8, value];
        self.queue.enqueue(move |bus: &mut B, advance: Advance<B>| {
            bus.send(
                address,
                &block,
                Box::new(move |rc: Result<(), B::Error>| {
                    advance.advance();
                    #[cfg(feature = "rttdebug")]
                    {
                        if let Err(err) = &rc {
                            rprintln!("write 0x{:x} failed: {:?}", block[0], err);
                        }
                    }
                    then(rc.map_err(Error::Comm));
                }),
            );
        });
    }

    fn read_registers<F>(&mut self, reg: Register, len: usize, then: F)
    where
        F: FnOnce(Result<Vec<u8>, Error<B::Error>>) + 'static,
    {
        let address = self.address;
        let start = reg as u8;
        self.queue.enqueue(move |bus: &mut B, advance: Advance<B>| {
            bus.transfer(
                address,
                &[start],
                len,
                Box::new(move |rc: Result<Vec<u8>, B::Error>| {
                    advance.advance();
                    #[cfg(feature = "rttdebug")]
                    {
                        if let Err(err) = &rc {
                            rprintln!("read 0x{:x} failed: {:?}", start, err);
                        }
                    }
                    then(expect_block(rc, len));
                }),
            );
        });
    }

    /// Read the data-ready and lock flags
    pub fn read_status<F>(&mut self, continuation: F)
    where
        F: FnOnce(Result<Status, Error<B::Error>>) + 'static,
    {
        self.read_registers(Register::Status, 1, move |rc| {
            continuation(rc.map(|block| Status::from_register(block[0])));
        });
    }

    /// Read all three axes in one six-byte transfer
    pub fn read_raw_data<F>(&mut self, continuation: F)
    where
        F: FnOnce(Result<RawSample, Error<B::Error>>) + 'static,
    {
        let order = self.axis_order;
        self.read_registers(Register::DataOutXMsb, 6, move |rc| {
            let sample = rc.map(|block| RawSample::decode(&block, order));
            #[cfg(feature = "rttdebug")]
            {
                if let Ok(s) = &sample {
                    rprintln!("read hx {} hy {} hz {}", s.x, s.y, s.z);
                }
            }
            continuation(sample);
        });
    }

    /// Read all three axes scaled to gauss, using the last gain set
    pub fn read_scaled<F>(&mut self, continuation: F)
    where
        F: FnOnce(Result<[f32; 3], Error<B::Error>>) + 'static,
    {
        let scale = self.gauss_per_lsb;
        self.read_raw_data(move |rc| {
            continuation(rc.map(|raw| {
                [
                    scale * (raw.x as f32),
                    scale * (raw.y as f32),
                    scale * (raw.z as f32),
                ]
            }));
        });
    }

    /// Magnetic bearing in degrees for the given horizontal components
    pub fn get_bearing(hx: i16, hy: i16) -> f32 {
        bearing::magnetic_bearing(hx, hy)
    }

    /// Read a sample and convert it to a bearing in [0, 360).
    /// With `declination_applied` the stored declination is added, giving
    /// a true bearing.
    pub fn read_bearing<F>(&mut self, declination_applied: bool, continuation: F)
    where
        F: FnOnce(Result<f32, Error<B::Error>>) + 'static,
    {
        let declination = if declination_applied {
            self.declination
        } else {
            0.0
        };
        self.read_raw_data(move |rc| {
            continuation(rc.map(|raw| {
                bearing::true_bearing(bearing::magnetic_bearing(raw.x, raw.y), declination)
            }));
        });
    }

    /// Set the magnetic declination in degrees, used by later
    /// [`Self::read_bearing`] requests
    pub fn set_declination(&mut self, degrees: f32) {
        self.declination = degrees;
    }

    pub fn declination(&self) -> f32 {
        self.declination
    }

    /// Set the sensor field range. Scaled reads requested after this call
    /// use the new gain.
    pub fn set_gain<F>(&mut self, gain: Gain, done: F)
    where
        F: FnOnce(Result<(), Error<B::Error>>) + 'static,
    {
        self.gauss_per_lsb = gain.scale();
        self.write_register(Register::ConfigB, gain.register_value(), done);
    }

    pub fn set_operating_mode<F>(&mut self, mode: OperatingMode, done: F)
    where
        F: FnOnce(Result<(), Error<B::Error>>) + 'static,
    {
        let value = config::mode_register(mode, self.high_speed);
        self.write_register(Register::Mode, value, done);
    }

    /// Read the identification registers and report whether they match
    /// the HMC5883L signature
    pub fn check_identity<F>(&mut self, continuation: F)
    where
        F: FnOnce(Result<bool, Error<B::Error>>) + 'static,
    {
        self.read_registers(Register::IdentA, IDENTITY.len(), move |rc| {
            let found = rc.map(|block| block[..] == IDENTITY[..]);
            #[cfg(feature = "rttdebug")]
            {
                if let Ok(false) = found {
                    rprintln!("bogus identity");
                }
            }
            continuation(found);
        });
    }

    /// True when no bus transaction is in flight or waiting
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    /// Number of bus transactions not yet completed
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Release the bus. Fails, returning the driver, while transactions
    /// are pending.
    pub fn release(self) -> Result<B, Self> {
        let Self {
            queue,
            address,
            axis_order,
            high_speed,
            declination,
            gauss_per_lsb,
            ready,
        } = self;
        queue.into_inner().map_err(|queue| Self {
            queue,
            address,
            axis_order,
            high_speed,
            declination,
            gauss_per_lsb,
            ready,
        })
    }
}

/// 7-bit I2C address (fixed)
pub const I2C_ADDRESS: u8 = 0x1E;

/// Identification registers A, B, C read back as ASCII "H43"
const IDENTITY: [u8; 3] = *b"H43";

/// Register map. Data output registers auto-increment on sequential reads.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    ConfigA = 0x00,
    ConfigB = 0x01,
    Mode = 0x02,
    DataOutXMsb = 0x03,
    DataOutXLsb = 0x04,
    DataOutZMsb = 0x05,
    DataOutZLsb = 0x06,
    DataOutYMsb = 0x07,
    DataOutYLsb = 0x08,
    Status = 0x09,
    IdentA = 0x0A,
    IdentB = 0x0B,
    IdentC = 0x0C,
}
