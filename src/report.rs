//! Plain-text rendering of a [`BenchReport`].

use std::fmt;
use std::io::{self, Write};

use crate::bench::{BenchReport, Strategy};

impl BenchReport {
    /// Writes the performance summary to `sink`.
    ///
    /// The layout is meant for people, not parsers: a header with the
    /// problem size and provider, one line per strategy with elapsed
    /// seconds, GFLOPS and speedup over naive, then the tile sweep if one
    /// was run.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "Matrix multiplication performance")?;
        writeln!(
            sink,
            "Generated: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S %z")
        )?;
        writeln!(
            sink,
            "Matrix size: {}x{} * {}x{}",
            self.m, self.k, self.k, self.n
        )?;
        writeln!(sink, "GEMM provider: {}", self.provider)?;
        writeln!(sink, "Best of {} run(s) per strategy", self.repeat)?;
        writeln!(sink, "{}", "-".repeat(60))?;
        writeln!(
            sink,
            "{:<22} {:>12} {:>10} {:>10}",
            "Strategy", "Seconds", "GFLOPS", "Speedup"
        )?;

        for timing in &self.timings {
            let label = match timing.tile_size {
                Some(tile) => format!("{} (tile {})", timing.strategy, tile),
                None => timing.strategy.to_string(),
            };
            let speedup = self
                .speedup(timing.strategy)
                .map_or_else(|| "n/a".to_string(), |s| format!("{:.2}x", s));
            writeln!(
                sink,
                "{:<22} {:>12.6} {:>10.2} {:>10}",
                label,
                timing.elapsed.as_secs_f64(),
                timing.gflops,
                speedup
            )?;
        }

        if !self.tile_sweep.is_empty() {
            writeln!(sink, "{}", "-".repeat(60))?;
            writeln!(sink, "Tile sweep:")?;
            for (tile, elapsed) in &self.tile_sweep {
                writeln!(
                    sink,
                    "  tile {:>5}: {:.6} seconds",
                    tile,
                    elapsed.as_secs_f64()
                )?;
            }
            if let Some(best) = self.timing(Strategy::Tiled).and_then(|t| t.tile_size) {
                writeln!(sink, "Best tile size: {}", best)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::Timing;
    use chrono::{Local, TimeZone};
    use std::time::Duration;

    fn report() -> BenchReport {
        BenchReport {
            m: 4,
            k: 5,
            n: 6,
            started_at: Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            provider: "ndarray".to_string(),
            repeat: 3,
            timings: vec![
                Timing {
                    strategy: Strategy::Naive,
                    tile_size: None,
                    elapsed: Duration::from_millis(400),
                    gflops: 1.0,
                },
                Timing {
                    strategy: Strategy::Tiled,
                    tile_size: Some(32),
                    elapsed: Duration::from_millis(100),
                    gflops: 4.0,
                },
                Timing {
                    strategy: Strategy::Reference,
                    tile_size: None,
                    elapsed: Duration::from_millis(10),
                    gflops: 40.0,
                },
            ],
            tile_sweep: vec![
                (16, Duration::from_millis(150)),
                (32, Duration::from_millis(100)),
            ],
        }
    }

    #[test]
    fn test_write_to_contains_every_line() {
        let text = report().to_string();

        assert!(text.contains("Generated: 2024-03-01 12:30:00"));
        assert!(text.contains("Matrix size: 4x5 * 5x6"));
        assert!(text.contains("GEMM provider: ndarray"));
        assert!(text.contains("Best of 3 run(s)"));
        assert!(text.contains("naive"));
        assert!(text.contains("tiled (tile 32)"));
        assert!(text.contains("reference"));
        assert!(text.contains("0.400000"));
        assert!(text.contains("4.00x"));
        assert!(text.contains("40.00x"));
        assert!(text.contains("tile    16: 0.150000 seconds"));
        assert!(text.contains("Best tile size: 32"));
    }

    #[test]
    fn test_write_to_without_sweep() {
        let mut r = report();
        r.tile_sweep.clear();

        let mut out = Vec::new();
        r.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(!text.contains("Tile sweep"));
        assert!(text.contains("1.00x"));
    }
}
