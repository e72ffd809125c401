//! Writes a synthetic set of expedition, peak and coordinate tables.
//!
//! Usage: generate_sample [output_dir]   (defaults to `input_data`)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use himalaya_dash::data::loader::{
    COORDINATES_FILE, COORDINATE_COLUMNS, DEFAULT_DATA_DIR, EXPEDITIONS_FILE, EXPEDITION_COLUMNS,
    PEAKS_FILE, PEAK_COLUMNS,
};

struct SamplePeak {
    id: &'static str,
    name: &'static str,
    height_m: u32,
    himal: &'static str,
    region: &'static str,
    coords: Option<(f64, f64)>,
    routes: &'static [&'static str],
    /// Relative share of all expeditions.
    popularity: f64,
    /// Summit probability of a typical expedition.
    base_success: f64,
}

const PEAKS: &[SamplePeak] = &[
    SamplePeak {
        id: "EVER",
        name: "Everest",
        height_m: 8849,
        himal: "Khumbu",
        region: "Khumbu-Rolwaling-Makalu",
        coords: Some((27.9881, 86.9250)),
        routes: &["S Col-SE Ridge", "N Col-NE Ridge", "W Ridge", "SW Face"],
        popularity: 0.30,
        base_success: 0.55,
    },
    SamplePeak {
        id: "AMAD",
        name: "Ama Dablam",
        height_m: 6814,
        himal: "Khumbu",
        region: "Khumbu-Rolwaling-Makalu",
        coords: Some((27.8617, 86.8614)),
        routes: &["SW Ridge", "N Ridge", "E Face"],
        popularity: 0.22,
        base_success: 0.70,
    },
    SamplePeak {
        id: "CHOY",
        name: "Cho Oyu",
        height_m: 8188,
        himal: "Khumbu",
        region: "Khumbu-Rolwaling-Makalu",
        coords: Some((28.0942, 86.6608)),
        routes: &["W Ridge", "SW Face", "SE Ridge"],
        popularity: 0.16,
        base_success: 0.50,
    },
    SamplePeak {
        id: "MANA",
        name: "Manaslu",
        height_m: 8163,
        himal: "Mansiri",
        region: "Manaslu-Ganesh",
        coords: Some((28.5497, 84.5597)),
        routes: &["NE Face", "S Face", "E Ridge"],
        popularity: 0.12,
        base_success: 0.45,
    },
    SamplePeak {
        id: "LHOT",
        name: "Lhotse",
        height_m: 8516,
        himal: "Khumbu",
        region: "Khumbu-Rolwaling-Makalu",
        coords: Some((27.9617, 86.9333)),
        routes: &["W Face", "S Face"],
        popularity: 0.08,
        base_success: 0.40,
    },
    SamplePeak {
        id: "ANN1",
        name: "Annapurna I",
        height_m: 8091,
        himal: "Annapurna",
        region: "Annapurna-Damodar-Peri",
        coords: Some((28.5961, 83.8203)),
        routes: &["N Face", "S Face", "E Ridge"],
        popularity: 0.06,
        base_success: 0.30,
    },
    SamplePeak {
        id: "PUMO",
        name: "Pumori",
        height_m: 7161,
        himal: "Khumbu",
        region: "Khumbu-Rolwaling-Makalu",
        coords: None,
        routes: &["SE Face", "E Ridge"],
        popularity: 0.06,
        base_success: 0.35,
    },
];

const SEASONS: &[(&str, f64)] = &[
    ("Spring", 0.50),
    ("Autumn", 0.40),
    ("Winter", 0.06),
    ("Summer", 0.04),
];

const HOSTS: &[(&str, f64)] = &[
    ("Nepal", 0.18),
    ("USA", 0.14),
    ("UK", 0.10),
    ("Japan", 0.10),
    ("France", 0.08),
    ("Germany", 0.07),
    ("China", 0.06),
    ("S Korea", 0.06),
    ("Italy", 0.05),
    ("Spain", 0.05),
    ("Switzerland", 0.04),
    ("Poland", 0.03),
    ("India", 0.02),
    ("Russia", 0.02),
];

const SUCCESS_REASON: &str = "Success (main peak)";

const FAILURE_REASONS: &[(&str, f64)] = &[
    ("Bad weather (storms, high winds)", 0.38),
    ("Bad conditions (deep snow, avalanching, falling ice, or rock)", 0.26),
    ("Illness, AMS, exhaustion, or frostbite", 0.12),
    ("Route technically too difficult, lack of experience, strength, or motivation", 0.10),
    ("Accident (death or serious injury)", 0.05),
    ("Lack (or loss) of supplies, support or equipment", 0.04),
    ("Did not attempt climb", 0.03),
    ("Other", 0.02),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Pick from `(item, weight)` pairs.
    fn weighted<'a, T>(&mut self, items: &'a [(T, f64)]) -> &'a T {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut target = self.next_f64() * total;
        for (item, weight) in items {
            if target < *weight {
                return item;
            }
            target -= weight;
        }
        &items[items.len() - 1].0
    }
}

/// Expeditions per year ramp up from a handful in 1950 to a few hundred.
fn expeditions_in(year: i32) -> usize {
    let t = f64::from(year - 1950) / 73.0;
    (4.0 + 120.0 * t * t) as usize
}

fn write_expeditions(dir: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let path = dir.join(EXPEDITIONS_FILE);
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(EXPEDITION_COLUMNS)?;

    let peak_weights: Vec<(&SamplePeak, f64)> = PEAKS.iter().map(|p| (p, p.popularity)).collect();
    let mut written = 0;
    for year in 1950..=2023 {
        for n in 0..expeditions_in(year) {
            let peak = *rng.weighted(&peak_weights);
            let season = *rng.weighted(SEASONS);
            let host = *rng.weighted(HOSTS);

            let days = rng.gauss(38.0, 14.0).round().max(1.0);
            // Longer expeditions and spring/autumn windows summit more often.
            let mut p = peak.base_success + (days - 38.0) / 200.0;
            if matches!(season, "Winter" | "Summer") {
                p *= 0.4;
            }
            p += f64::from(year - 1950) / 400.0;

            let mut routes = [String::new(), String::new(), String::new(), String::new()];
            let mut successes = [String::new(), String::new(), String::new(), String::new()];
            let extra_routes = usize::from(rng.chance(0.15)) + usize::from(rng.chance(0.03));
            for slot in 0..=extra_routes {
                let idx = (rng.next_u64() % peak.routes.len() as u64) as usize;
                routes[slot] = peak.routes[idx].to_string();
                successes[slot] = if rng.chance(p.clamp(0.02, 0.95)) {
                    "TRUE".into()
                } else {
                    "FALSE".into()
                };
            }
            let any_success = successes.iter().any(|s| s == "TRUE");
            let reason = if any_success {
                SUCCESS_REASON
            } else {
                *rng.weighted(FAILURE_REASONS)
            };

            let days = if rng.chance(0.04) { "NA".to_string() } else { days.to_string() };
            let host = if rng.chance(0.02) { "" } else { host };

            let exp_id = format!("{}{}{:03}", peak.id, year % 100, n + 1);
            let year = year.to_string();
            let record: [&str; 15] = [
                &exp_id,
                peak.id,
                &year,
                season,
                &routes[0],
                &routes[1],
                &routes[2],
                &routes[3],
                &successes[0],
                &successes[1],
                &successes[2],
                &successes[3],
                &days,
                host,
                reason,
            ];
            writer.write_record(record)?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

fn write_peaks(dir: &Path) -> Result<()> {
    let path = dir.join(PEAKS_FILE);
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(PEAK_COLUMNS)?;
    for p in PEAKS {
        let height = p.height_m.to_string();
        writer.write_record([p.id, p.name, height.as_str(), p.himal, p.region])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_coordinates(dir: &Path) -> Result<()> {
    let path = dir.join(COORDINATES_FILE);
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(COORDINATE_COLUMNS)?;
    for p in PEAKS {
        if let Some((lat, lon)) = p.coords {
            let (lat, lon) = (lat.to_string(), lon.to_string());
            writer.write_record([p.id, lat.as_str(), lon.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let expeditions = write_expeditions(&dir, &mut rng)?;
    write_peaks(&dir)?;
    write_coordinates(&dir)?;

    println!(
        "Wrote {expeditions} expeditions on {} peaks to {}",
        PEAKS.len(),
        dir.display()
    );
    Ok(())
}
