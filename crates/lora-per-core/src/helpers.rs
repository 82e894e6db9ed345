//! Formatting and radio timing helpers.
//!
//! The time-on-air computation follows the LoRa modem symbol arithmetic used
//! by the LR11xx driver: the frame duration is computed in quarter symbols so
//! the fractional preamble overhead stays integral, then scaled by the symbol
//! duration `2^SF / BW`.

use std::time::Duration;

use crate::types::{Bandwidth, LoraModulation, LoraPacketParams, SpreadingFactor};

/// Symbol time at or above which low data rate optimisation is required.
const LDRO_SYMBOL_TIME_US: u64 = 16_380;

/// Format a frequency in hertz as a human-readable MHz string.
///
/// # Example
///
/// ```
/// use lora_per_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(868_100_000), "868.100000 MHz");
/// assert_eq!(format_freq_mhz(915_000_000), "915.000000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u32) -> String {
    let mhz = f64::from(freq_hz) / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

/// Duration of one LoRa symbol in microseconds.
pub fn symbol_time_us(sf: SpreadingFactor, bw: Bandwidth) -> u64 {
    (1u64 << sf.value()) * 1_000_000 / u64::from(bw.hz())
}

/// Whether low data rate optimisation must be enabled for this SF/BW pair.
pub fn needs_ldro(sf: SpreadingFactor, bw: Bandwidth) -> bool {
    symbol_time_us(sf, bw) >= LDRO_SYMBOL_TIME_US
}

/// Time on air numerator: frame length in units of `1 / BW` seconds.
fn time_on_air_numerator(modulation: &LoraModulation, packet: &LoraPacketParams) -> u64 {
    let sf = i64::from(modulation.spreading_factor.value());
    let low_sf = sf <= 6;

    let mut ceil_numerator = (i64::from(packet.payload_len) << 3) - 4 * sf
        + if packet.crc_on { 16 } else { 0 }
        + if packet.explicit_header { 20 } else { 0 };

    let ceil_denominator = if low_sf {
        4 * sf
    } else {
        ceil_numerator += 8;
        if modulation.ldro { 4 * (sf - 2) } else { 4 * sf }
    };

    let ceil_numerator = ceil_numerator.max(0);
    let payload_blocks = (ceil_numerator + ceil_denominator - 1) / ceil_denominator;

    // Whole symbols: payload + preamble + sync word/header overhead.
    let mut symbols = payload_blocks * i64::from(modulation.coding_rate.denominator())
        + i64::from(packet.preamble_len)
        + 12;
    if low_sf {
        symbols += 2;
    }

    // Quarter symbols, with the trailing 0.25 of the preamble, then scale by
    // 2^SF / 4 to express the result in units of 1 / BW.
    ((4 * symbols + 1) as u64) << (sf as u32 - 2)
}

/// Time on air of one LoRa frame, rounded up to the next millisecond.
///
/// # Example
///
/// ```
/// use lora_per_core::{Bandwidth, CodingRate, LoraModulation, LoraPacketParams, SpreadingFactor};
/// use lora_per_core::lora_time_on_air_ms;
///
/// let modulation = LoraModulation {
///     spreading_factor: SpreadingFactor::Sf7,
///     bandwidth: Bandwidth::Bw125,
///     coding_rate: CodingRate::Cr4_5,
///     ldro: false,
/// };
/// assert_eq!(lora_time_on_air_ms(&modulation, &LoraPacketParams::default()), 57);
/// ```
pub fn lora_time_on_air_ms(modulation: &LoraModulation, packet: &LoraPacketParams) -> u32 {
    let numerator = time_on_air_numerator(modulation, packet) * 1000;
    let bw = u64::from(modulation.bandwidth.hz());
    numerator.div_ceil(bw) as u32
}

/// Time on air of one LoRa frame as a [`Duration`].
pub fn lora_time_on_air(modulation: &LoraModulation, packet: &LoraPacketParams) -> Duration {
    Duration::from_millis(u64::from(lora_time_on_air_ms(modulation, packet)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodingRate;

    fn modulation(sf: SpreadingFactor, bw: Bandwidth) -> LoraModulation {
        LoraModulation {
            spreading_factor: sf,
            bandwidth: bw,
            coding_rate: CodingRate::Cr4_5,
            ldro: needs_ldro(sf, bw),
        }
    }

    #[test]
    fn format_freq_mhz_sub_ghz() {
        assert_eq!(format_freq_mhz(868_000_000), "868.000000 MHz");
        assert_eq!(format_freq_mhz(433_175_000), "433.175000 MHz");
    }

    #[test]
    fn symbol_time_sf7_125k() {
        assert_eq!(symbol_time_us(SpreadingFactor::Sf7, Bandwidth::Bw125), 1024);
    }

    #[test]
    fn ldro_threshold() {
        assert!(!needs_ldro(SpreadingFactor::Sf10, Bandwidth::Bw125));
        assert!(needs_ldro(SpreadingFactor::Sf11, Bandwidth::Bw125));
        assert!(needs_ldro(SpreadingFactor::Sf12, Bandwidth::Bw125));
        assert!(!needs_ldro(SpreadingFactor::Sf12, Bandwidth::Bw500));
    }

    #[test]
    fn time_on_air_sf7_125k_20_bytes() {
        // 55.25 symbols of 1.024 ms.
        let m = modulation(SpreadingFactor::Sf7, Bandwidth::Bw125);
        assert_eq!(lora_time_on_air_ms(&m, &LoraPacketParams::default()), 57);
    }

    #[test]
    fn time_on_air_grows_with_spreading_factor() {
        let packet = LoraPacketParams::default();
        let mut last = 0;
        for sf in [
            SpreadingFactor::Sf5,
            SpreadingFactor::Sf7,
            SpreadingFactor::Sf9,
            SpreadingFactor::Sf12,
        ] {
            let toa = lora_time_on_air_ms(&modulation(sf, Bandwidth::Bw125), &packet);
            assert!(toa > last, "{sf}: {toa} ms should exceed {last} ms");
            last = toa;
        }
    }

    #[test]
    fn time_on_air_shrinks_with_bandwidth() {
        let packet = LoraPacketParams::default();
        let narrow = lora_time_on_air_ms(&modulation(SpreadingFactor::Sf9, Bandwidth::Bw62), &packet);
        let wide = lora_time_on_air_ms(&modulation(SpreadingFactor::Sf9, Bandwidth::Bw500), &packet);
        assert!(narrow > wide);
    }

    #[test]
    fn time_on_air_duration_matches_ms() {
        let m = modulation(SpreadingFactor::Sf7, Bandwidth::Bw125);
        let packet = LoraPacketParams::default();
        assert_eq!(
            lora_time_on_air(&m, &packet),
            Duration::from_millis(u64::from(lora_time_on_air_ms(&m, &packet)))
        );
    }
}
