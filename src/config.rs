/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

/// Number of samples averaged per measurement output (CRA bits 6:5)
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleAveraging {
    Samples_1 = 0b00,
    Samples_2 = 0b01,
    Samples_4 = 0b10,
    Samples_8 = 0b11,
}

impl Default for SampleAveraging {
    fn default() -> Self {
        SampleAveraging::Samples_1
    }
}

/// Data output rate in continuous measurement mode (CRA bits 4:2)
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataRate {
    Rate_0_75Hz = 0b000,
    Rate_1_5Hz = 0b001,
    Rate_3Hz = 0b010,
    Rate_7_5Hz = 0b011,
    Rate_15Hz = 0b100,
    Rate_30Hz = 0b101,
    Rate_75Hz = 0b110,
}

impl Default for DataRate {
    fn default() -> Self {
        DataRate::Rate_30Hz
    }
}

/// Measurement flow, including the self-test bias modes (CRA bits 1:0)
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeasurementBias {
    Normal = 0b00,
    Positive = 0b01,
    Negative = 0b10,
}

impl Default for MeasurementBias {
    fn default() -> Self {
        MeasurementBias::Normal
    }
}

/// Operating mode (MR bits 1:0)
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// free-runs at the configured data output rate
    Continuous = 0b00,
    /// one measurement, then back to idle
    Single = 0b01,
    Idle = 0b11,
}

impl Default for OperatingMode {
    fn default() -> Self {
        OperatingMode::Continuous
    }
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Sensor field range, as gain in LSB per gauss (CRB bits 7:5)
pub enum Gain {
    /// ±0.88 Ga
    Gain_1370 = 0b000,
    /// ±1.3 Ga
    Gain_1090 = 0b001,
    /// ±1.9 Ga
    Gain_820 = 0b010,
    /// ±2.5 Ga
    Gain_660 = 0b011,
    /// ±4.0 Ga
    Gain_440 = 0b100,
    /// ±4.7 Ga
    Gain_390 = 0b101,
    /// ±5.6 Ga
    Gain_330 = 0b110,
    /// ±8.1 Ga
    Gain_230 = 0b111,
}

// power-on value of CRB
impl Default for Gain {
    fn default() -> Self {
        Gain::Gain_1090
    }
}

impl Gain {
    /// Field strength in gauss per bit
    pub(crate) fn scale(&self) -> f32 {
        1.0 / self.lsb_per_gauss()
    }

    pub(crate) fn lsb_per_gauss(&self) -> f32 {
        match self {
            Gain::Gain_1370 => 1370.0,
            Gain::Gain_1090 => 1090.0,
            Gain::Gain_820 => 820.0,
            Gain::Gain_660 => 660.0,
            Gain::Gain_440 => 440.0,
            Gain::Gain_390 => 390.0,
            Gain::Gain_330 => 330.0,
            Gain::Gain_230 => 230.0,
        }
    }

    pub(crate) fn register_value(&self) -> u8 {
        (*self as u8) << 5
    }
}

/// Order of the three axis output pairs starting at the X MSB register.
///
/// The HMC5883L places Z between X and Y. Some register-compatible
/// parts in this family report X, Y, Z instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisOrder {
    Xzy,
    Xyz,
}

impl Default for AxisOrder {
    fn default() -> Self {
        AxisOrder::Xzy
    }
}

/// Settings applied when the device is opened
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    pub samples: SampleAveraging,
    pub data_rate: DataRate,
    pub bias: MeasurementBias,
    pub mode: OperatingMode,
    /// enable 3400 kHz I2C (MR bit 7)
    pub high_speed: bool,
    pub axis_order: AxisOrder,
    /// magnetic-to-true north correction, in degrees
    pub declination: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            samples: SampleAveraging::default(),
            data_rate: DataRate::default(),
            bias: MeasurementBias::default(),
            mode: OperatingMode::default(),
            high_speed: false,
            axis_order: AxisOrder::default(),
            declination: 0.0,
        }
    }
}

impl Config {
    pub fn samples(mut self, samples: SampleAveraging) -> Self {
        self.samples = samples;
        self
    }

    pub fn data_rate(mut self, data_rate: DataRate) -> Self {
        self.data_rate = data_rate;
        self
    }

    pub fn bias(mut self, bias: MeasurementBias) -> Self {
        self.bias = bias;
        self
    }

    pub fn mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn high_speed(mut self, high_speed: bool) -> Self {
        self.high_speed = high_speed;
        self
    }

    pub fn axis_order(mut self, axis_order: AxisOrder) -> Self {
        self.axis_order = axis_order;
        self
    }

    pub fn declination(mut self, degrees: f32) -> Self {
        self.declination = degrees;
        self
    }

    /// Value written to configuration register A
    pub(crate) fn config_a(&self) -> u8 {
        (self.samples as u8) << 5 | (self.data_rate as u8) << 2 | self.bias as u8
    }

    /// Value written to the mode register
    pub(crate) fn mode_register(&self) -> u8 {
        mode_register(self.mode, self.high_speed)
    }
}

pub(crate) fn mode_register(mode: OperatingMode, high_speed: bool) -> u8 {
    /// MR bit 7
    const HIGH_SPEED: u8 = 1 << 7;

    let flags = if high_speed { HIGH_SPEED } else { 0 };
    flags | mode as u8
}
