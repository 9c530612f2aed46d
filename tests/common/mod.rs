#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use hmc5883l::{BusTransport, Completion};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BusFault;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Send { address: u8, bytes: Vec<u8> },
    Transfer { address: u8, bytes: Vec<u8>, read_len: usize },
}

enum InFlight {
    Send(Completion<(), BusFault>),
    Transfer(Completion<Vec<u8>, BusFault>),
}

/// Everything the deferred bus saw, plus the completion it is holding
#[derive(Default)]
pub struct BusLog {
    pub ops: Vec<Op>,
    in_flight: Option<InFlight>,
}

impl BusLog {
    pub fn busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

pub type SharedLog = Rc<RefCell<BusLog>>;

/// Bus whose requests only complete when the test says so
pub struct DeferredBus {
    log: SharedLog,
}

impl DeferredBus {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl BusTransport for DeferredBus {
    type Error = BusFault;

    fn send(&mut self, address: u8, bytes: &[u8], done: Completion<(), BusFault>) {
        let mut log = self.log.borrow_mut();
        assert!(!log.busy(), "second transaction issued while one is in flight");
        log.ops.push(Op::Send {
            address,
            bytes: bytes.to_vec(),
        });
        log.in_flight = Some(InFlight::Send(done));
    }

    fn transfer(
        &mut self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
        done: Completion<Vec<u8>, BusFault>,
    ) {
        let mut log = self.log.borrow_mut();
        assert!(!log.busy(), "second transaction issued while one is in flight");
        log.ops.push(Op::Transfer {
            address,
            bytes: bytes.to_vec(),
            read_len,
        });
        log.in_flight = Some(InFlight::Transfer(done));
    }
}

pub fn finish_send(log: &SharedLog, rc: Result<(), BusFault>) {
    let in_flight = log.borrow_mut().in_flight.take();
    match in_flight {
        Some(InFlight::Send(done)) => done(rc),
        _ => panic!("no write in flight"),
    }
}

pub fn finish_transfer(log: &SharedLog, rc: Result<Vec<u8>, BusFault>) {
    let in_flight = log.borrow_mut().in_flight.take();
    match in_flight {
        Some(InFlight::Transfer(done)) => done(rc),
        _ => panic!("no read in flight"),
    }
}

pub fn write_op(bytes: &[u8]) -> Op {
    Op::Send {
        address: hmc5883l::I2C_ADDRESS,
        bytes: bytes.to_vec(),
    }
}

pub fn read_op(reg: u8, read_len: usize) -> Op {
    Op::Transfer {
        address: hmc5883l::I2C_ADDRESS,
        bytes: vec![reg],
        read_len,
    }
}

/// Shared list the continuations append to
pub type Recorder<T> = Rc<RefCell<Vec<T>>>;

pub fn recorder<T>() -> Recorder<T> {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {} got {}",
        expected,
        actual
    );
}
