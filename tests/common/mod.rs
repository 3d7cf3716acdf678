//! Shared fixtures for integration tests

use std::fmt::Write as _;
use std::path::Path;

/// Three days of 15-minute sensor readings with a clear-sky irradiation curve
/// and an AC output roughly proportional to it.
pub fn write_sensor_csv(path: &Path) {
    let mut csv = String::from("DATE_TIME,AMBIENT_TEMPERATURE,MODULE_TEMPERATURE,IRRADIATION,AC Power\n");
    for day in 15..18 {
        for step in 0..96 {
            let hour = step / 4;
            let minute = (step % 4) * 15;
            let h = hour as f64 + minute as f64 / 60.0;
            let irradiation = if (6.0..=18.0).contains(&h) {
                (std::f64::consts::PI * (h - 6.0) / 12.0).sin().max(0.0)
            } else {
                0.0
            };
            let ambient = 22.0 + 6.0 * irradiation;
            let module = ambient + 20.0 * irradiation;
            let ac_power = 900.0 * irradiation - 2.0 * (module - 25.0).max(0.0) * irradiation;
            writeln!(
                csv,
                "2020-05-{:02} {:02}:{:02}:00,{:.3},{:.3},{:.4},{:.2}",
                day, hour, minute, ambient, module, irradiation, ac_power
            )
            .unwrap();
        }
    }
    std::fs::write(path, csv).unwrap();
}
