//! PER counters and the end-of-campaign report.

use std::fmt;

use lora_per_core::PacketType;

/// Outcome counters accumulated while a campaign runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerCounters {
    /// Frames received with the expected length.
    pub nb_ok: u32,
    pub nb_rx_timeout: u32,
    pub nb_crc_error: u32,
    /// GFSK length errors. Always zero on a LoRa link.
    pub nb_length_error: u32,
    /// Frames received, whatever their length.
    pub per_index: u32,
}

/// Packet error rate in percent: `100 - nb_ok * 100 / nb_frames`.
///
/// Integer arithmetic, truncating, so 19 good frames out of 20 give 5 and
/// 1 out of 3 gives 67. A zero target is reported as 100.
pub fn per_percent(nb_ok: u32, nb_frames: u32) -> u32 {
    if nb_frames == 0 {
        return 100;
    }
    let received = u64::from(nb_ok) * 100 / u64::from(nb_frames);
    100u32.saturating_sub(u32::try_from(received).unwrap_or(u32::MAX))
}

/// Final statistics of a receive campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerReport {
    pub per_percent: u32,
    pub per_index: u32,
    pub nb_ok: u32,
    pub nb_rx_timeout: u32,
    pub nb_crc_error: u32,
    pub nb_length_error: u32,
    pub nb_frames: u32,
    pub packet_type: PacketType,
}

impl PerReport {
    /// Build the report from the final counters.
    ///
    /// If the frame index ran past the target, the last validated frame is
    /// not counted.
    pub fn new(counters: PerCounters, nb_frames: u32, packet_type: PacketType) -> Self {
        let mut nb_ok = counters.nb_ok;
        if counters.per_index > nb_frames {
            nb_ok = nb_ok.saturating_sub(1);
        }
        PerReport {
            per_percent: per_percent(nb_ok, nb_frames),
            per_index: counters.per_index,
            nb_ok,
            nb_rx_timeout: counters.nb_rx_timeout,
            nb_crc_error: counters.nb_crc_error,
            nb_length_error: counters.nb_length_error,
            nb_frames,
            packet_type,
        }
    }

    /// The report as printed on the console, one line per figure.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("PER = {}", self.per_percent),
            format!("Final PER index: {}", self.per_index),
            format!("Valid reception amount: {}", self.nb_ok),
            format!("Timeout reception amount: {}", self.nb_rx_timeout),
            format!("CRC Error reception amount: {}", self.nb_crc_error),
        ];
        if self.packet_type == PacketType::Gfsk {
            lines.push(format!(
                "FSK Length Error reception amount: {}",
                self.nb_length_error
            ));
        }
        lines
    }
}

impl fmt::Display for PerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PER {}% ({}/{} ok, {} timeouts, {} CRC errors)",
            self.per_percent, self.nb_ok, self.nb_frames, self.nb_rx_timeout, self.nb_crc_error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_integer_truncation() {
        assert_eq!(per_percent(18, 20), 10);
        assert_eq!(per_percent(19, 20), 5);
        assert_eq!(per_percent(20, 20), 0);
        assert_eq!(per_percent(0, 20), 100);
        // 100 - 33 = 67, not 66.67 rounded.
        assert_eq!(per_percent(1, 3), 67);
        assert_eq!(per_percent(2, 3), 34);
    }

    #[test]
    fn per_single_frame() {
        assert_eq!(per_percent(1, 1), 0);
        assert_eq!(per_percent(0, 1), 100);
    }

    #[test]
    fn per_zero_target() {
        assert_eq!(per_percent(0, 0), 100);
    }

    #[test]
    fn report_corrects_overrun() {
        let counters = PerCounters {
            nb_ok: 20,
            per_index: 21,
            ..PerCounters::default()
        };
        let report = PerReport::new(counters, 20, PacketType::LoRa);
        assert_eq!(report.nb_ok, 19);
        assert_eq!(report.per_percent, 5);
        assert_eq!(report.per_index, 21);
    }

    #[test]
    fn report_without_overrun_is_unchanged() {
        let counters = PerCounters {
            nb_ok: 18,
            nb_rx_timeout: 2,
            per_index: 20,
            ..PerCounters::default()
        };
        let report = PerReport::new(counters, 20, PacketType::LoRa);
        assert_eq!(report.nb_ok, 18);
        assert_eq!(report.per_percent, 10);
    }

    #[test]
    fn lora_report_lines() {
        let counters = PerCounters {
            nb_ok: 18,
            nb_rx_timeout: 2,
            nb_crc_error: 1,
            per_index: 20,
            ..PerCounters::default()
        };
        let lines = PerReport::new(counters, 20, PacketType::LoRa).lines();
        assert_eq!(
            lines,
            vec![
                "PER = 10",
                "Final PER index: 20",
                "Valid reception amount: 18",
                "Timeout reception amount: 2",
                "CRC Error reception amount: 1",
            ]
        );
    }

    #[test]
    fn gfsk_report_includes_length_errors() {
        let counters = PerCounters {
            nb_length_error: 3,
            ..PerCounters::default()
        };
        let lines = PerReport::new(counters, 20, PacketType::Gfsk).lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "FSK Length Error reception amount: 3");
    }

    #[test]
    fn display_summary() {
        let counters = PerCounters {
            nb_ok: 18,
            nb_rx_timeout: 2,
            per_index: 20,
            ..PerCounters::default()
        };
        let report = PerReport::new(counters, 20, PacketType::LoRa);
        assert_eq!(
            report.to_string(),
            "PER 10% (18/20 ok, 2 timeouts, 0 CRC errors)"
        );
    }
}
