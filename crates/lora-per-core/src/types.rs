//! LoRa physical-layer parameter types used throughout the test rig.
//!
//! Each enum maps the numeric code carried by an AT command parameter to a
//! strongly typed value. Conversions from raw integers go through
//! `TryFrom<i64>` and reject anything outside the radio's supported set with
//! [`Error::InvalidParameter`].

use std::fmt;

use crate::error::{Error, Result};

/// LoRa spreading factor, SF5 through SF12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpreadingFactor {
    Sf5 = 5,
    Sf6 = 6,
    Sf7 = 7,
    Sf8 = 8,
    Sf9 = 9,
    Sf10 = 10,
    Sf11 = 11,
    Sf12 = 12,
}

impl SpreadingFactor {
    /// The numeric spreading factor (5..=12).
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<i64> for SpreadingFactor {
    type Error = Error;

    fn try_from(n: i64) -> Result<Self> {
        Ok(match n {
            5 => SpreadingFactor::Sf5,
            6 => SpreadingFactor::Sf6,
            7 => SpreadingFactor::Sf7,
            8 => SpreadingFactor::Sf8,
            9 => SpreadingFactor::Sf9,
            10 => SpreadingFactor::Sf10,
            11 => SpreadingFactor::Sf11,
            12 => SpreadingFactor::Sf12,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "spreading factor {n} out of range 5..=12"
                )));
            }
        })
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SF{}", self.value())
    }
}

/// LoRa channel bandwidth.
///
/// Variants are named after the nominal kHz figure used on the command line.
/// The sub-125 kHz and 2.4 GHz bandwidths are not round numbers; see
/// [`Bandwidth::hz`] for the exact value programmed into the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bandwidth {
    Bw10,
    Bw15,
    Bw20,
    Bw31,
    Bw41,
    Bw62,
    Bw125,
    Bw200,
    Bw250,
    Bw400,
    Bw500,
    Bw800,
}

impl Bandwidth {
    /// Every supported bandwidth, in ascending order.
    pub const ALL: [Bandwidth; 12] = [
        Bandwidth::Bw10,
        Bandwidth::Bw15,
        Bandwidth::Bw20,
        Bandwidth::Bw31,
        Bandwidth::Bw41,
        Bandwidth::Bw62,
        Bandwidth::Bw125,
        Bandwidth::Bw200,
        Bandwidth::Bw250,
        Bandwidth::Bw400,
        Bandwidth::Bw500,
        Bandwidth::Bw800,
    ];

    /// The nominal kHz figure accepted by `AT+BW`.
    pub fn khz(&self) -> u32 {
        match self {
            Bandwidth::Bw10 => 10,
            Bandwidth::Bw15 => 15,
            Bandwidth::Bw20 => 20,
            Bandwidth::Bw31 => 31,
            Bandwidth::Bw41 => 41,
            Bandwidth::Bw62 => 62,
            Bandwidth::Bw125 => 125,
            Bandwidth::Bw200 => 200,
            Bandwidth::Bw250 => 250,
            Bandwidth::Bw400 => 400,
            Bandwidth::Bw500 => 500,
            Bandwidth::Bw800 => 800,
        }
    }

    /// The exact bandwidth in hertz.
    pub fn hz(&self) -> u32 {
        match self {
            Bandwidth::Bw10 => 10_417,
            Bandwidth::Bw15 => 15_625,
            Bandwidth::Bw20 => 20_833,
            Bandwidth::Bw31 => 31_250,
            Bandwidth::Bw41 => 41_667,
            Bandwidth::Bw62 => 62_500,
            Bandwidth::Bw125 => 125_000,
            Bandwidth::Bw200 => 203_125,
            Bandwidth::Bw250 => 250_000,
            Bandwidth::Bw400 => 406_250,
            Bandwidth::Bw500 => 500_000,
            Bandwidth::Bw800 => 812_500,
        }
    }
}

impl TryFrom<i64> for Bandwidth {
    type Error = Error;

    fn try_from(khz: i64) -> Result<Self> {
        Bandwidth::ALL
            .iter()
            .copied()
            .find(|bw| i64::from(bw.khz()) == khz)
            .ok_or_else(|| Error::InvalidParameter(format!("unsupported bandwidth {khz} kHz")))
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.khz())
    }
}

/// LoRa forward error correction coding rate.
///
/// Discriminants are the radio's coding rate codes, which are also the values
/// accepted by `AT+CR`. The `Li` variants use long interleaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodingRate {
    NoCr = 0,
    Cr4_5 = 1,
    Cr4_6 = 2,
    Cr4_7 = 3,
    Cr4_8 = 4,
    LiCr4_5 = 5,
    LiCr4_6 = 6,
    LiCr4_8 = 7,
}

impl CodingRate {
    /// The radio coding rate code (0..=7).
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Denominator of the coding rate (the `n` in `4/n`).
    pub fn denominator(&self) -> u32 {
        match self {
            CodingRate::NoCr => 4,
            CodingRate::Cr4_5 | CodingRate::LiCr4_5 => 5,
            CodingRate::Cr4_6 | CodingRate::LiCr4_6 => 6,
            CodingRate::Cr4_7 => 7,
            CodingRate::Cr4_8 | CodingRate::LiCr4_8 => 8,
        }
    }
}

impl TryFrom<i64> for CodingRate {
    type Error = Error;

    fn try_from(n: i64) -> Result<Self> {
        Ok(match n {
            0 => CodingRate::NoCr,
            1 => CodingRate::Cr4_5,
            2 => CodingRate::Cr4_6,
            3 => CodingRate::Cr4_7,
            4 => CodingRate::Cr4_8,
            5 => CodingRate::LiCr4_5,
            6 => CodingRate::LiCr4_6,
            7 => CodingRate::LiCr4_8,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "coding rate {n} out of range 0..=7"
                )));
            }
        })
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodingRate::NoCr => write!(f, "none"),
            CodingRate::LiCr4_5 | CodingRate::LiCr4_6 | CodingRate::LiCr4_8 => {
                write!(f, "4/{} LI", self.denominator())
            }
            _ => write!(f, "4/{}", self.denominator()),
        }
    }
}

/// Which end of the link this rig plays during a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Sends frames forever; never terminates the campaign on its own.
    #[default]
    Transmitter,
    /// Counts frames and ends the campaign when the target is reached.
    Receiver,
}

impl Role {
    /// Map an `AT+TRSW` value: `1` selects the receiver, anything else the
    /// transmitter.
    pub fn from_switch(value: i64) -> Self {
        if value == 1 {
            Role::Receiver
        } else {
            Role::Transmitter
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Transmitter => write!(f, "Transmitter"),
            Role::Receiver => write!(f, "Receiver"),
        }
    }
}

/// Packet framing used on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PacketType {
    #[default]
    LoRa,
    Gfsk,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::LoRa => write!(f, "LoRa"),
            PacketType::Gfsk => write!(f, "GFSK"),
        }
    }
}

/// The full set of LoRa modulation parameters handed to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoraModulation {
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
    /// Low data rate optimisation, required for long symbol times.
    pub ldro: bool,
}

impl fmt::Display for LoraModulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / CR {}{}",
            self.spreading_factor,
            self.bandwidth,
            self.coding_rate,
            if self.ldro { " / LDRO" } else { "" }
        )
    }
}

/// LoRa packet framing parameters used for time-on-air computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoraPacketParams {
    pub preamble_len: u16,
    pub payload_len: u8,
    pub explicit_header: bool,
    pub crc_on: bool,
}

impl Default for LoraPacketParams {
    fn default() -> Self {
        LoraPacketParams {
            preamble_len: 8,
            payload_len: 20,
            explicit_header: true,
            crc_on: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreading_factor_range() {
        assert_eq!(SpreadingFactor::try_from(5).unwrap(), SpreadingFactor::Sf5);
        assert_eq!(SpreadingFactor::try_from(12).unwrap(), SpreadingFactor::Sf12);
        assert!(SpreadingFactor::try_from(4).is_err());
        assert!(SpreadingFactor::try_from(13).is_err());
        assert!(SpreadingFactor::try_from(-7).is_err());
    }

    #[test]
    fn spreading_factor_display() {
        assert_eq!(SpreadingFactor::Sf9.to_string(), "SF9");
    }

    #[test]
    fn bandwidth_accepts_only_listed_values() {
        for khz in [10, 15, 20, 31, 41, 62, 125, 200, 250, 400, 500, 800] {
            let bw = Bandwidth::try_from(khz).unwrap();
            assert_eq!(i64::from(bw.khz()), khz);
        }
        for khz in [0, 7, 100, 126, 1000] {
            assert!(Bandwidth::try_from(khz).is_err(), "{khz} should be rejected");
        }
    }

    #[test]
    fn bandwidth_exact_hz() {
        assert_eq!(Bandwidth::Bw125.hz(), 125_000);
        assert_eq!(Bandwidth::Bw62.hz(), 62_500);
        assert_eq!(Bandwidth::Bw800.hz(), 812_500);
    }

    #[test]
    fn coding_rate_codes() {
        for n in 0..=7 {
            assert_eq!(i64::from(CodingRate::try_from(n).unwrap().code()), n);
        }
        assert!(CodingRate::try_from(8).is_err());
        assert_eq!(CodingRate::Cr4_5.to_string(), "4/5");
        assert_eq!(CodingRate::LiCr4_8.to_string(), "4/8 LI");
    }

    #[test]
    fn role_switch_mapping() {
        assert_eq!(Role::from_switch(1), Role::Receiver);
        assert_eq!(Role::from_switch(0), Role::Transmitter);
        assert_eq!(Role::from_switch(7), Role::Transmitter);
        assert_eq!(Role::default(), Role::Transmitter);
    }

    #[test]
    fn modulation_display() {
        let m = LoraModulation {
            spreading_factor: SpreadingFactor::Sf12,
            bandwidth: Bandwidth::Bw125,
            coding_rate: CodingRate::Cr4_5,
            ldro: true,
        };
        assert_eq!(m.to_string(), "SF12 / 125 kHz / CR 4/5 / LDRO");
    }
}
