use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parquet::arrow::ArrowWriter;

const FILL_VALUE: &str = "-9999999";
const ACCEPTED: [&str; 2] = ["*0000000000000100", "*0000000000000101"];
const QUESTIONABLE: &str = "*0000000000001000";
const BAD: &str = "*0000000000010000";

const TEXT_COLUMNS: [&str; 3] = ["Cruise", "Station", "Target Asset"];
const TIME_COLUMN: &str = "CTD Bottle Closure Time [UTC]";
const NUMERIC_COLUMNS: [&str; 10] = [
    "CTD Depth [m]",
    "CTD Latitude [deg]",
    "CTD Longitude [deg]",
    "Discrete Oxygen [mL/L]",
    "Discrete Salinity [psu]",
    "Discrete Nitrate [uM]",
    "Discrete Nitrite [uM]",
    "Discrete Silicate [uM]",
    "Discrete Phosphate [uM]",
    "Discrete Ammonium [uM]",
];
const FLAG_COLUMNS: [&str; 3] = [
    "Discrete Oxygen Flag",
    "Discrete Salinity Flag",
    "Discrete Nutrients Flag",
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// A QC flag: mostly acceptable, sometimes questionable, bad or blank.
    fn flag(&mut self) -> Option<String> {
        let p = self.next_f64();
        if p < 0.70 {
            Some(ACCEPTED[(self.next_u64() % 2) as usize].to_string())
        } else if p < 0.82 {
            Some(QUESTIONABLE.to_string())
        } else if p < 0.90 {
            Some(BAD.to_string())
        } else {
            None
        }
    }
}

/// One bottle: text, closure time, numeric values, flags (`None` = missing).
struct Bottle {
    text: [String; 3],
    closed_at: DateTime<Utc>,
    numbers: [Option<f64>; 10],
    flags: [Option<String>; 3],
}

/// Rough open-ocean profiles: oxygen falls and nutrients rise with depth.
fn bottle(
    rng: &mut SimpleRng,
    text: [String; 3],
    closed_at: DateTime<Utc>,
    position: (f64, f64),
    depth: f64,
) -> Bottle {
    let d = (depth / 500.0).min(1.0);
    let mut value = |mean: f64, sd: f64| Some(rng.gauss(mean, sd).max(0.0));
    let numbers = [
        Some(depth),
        Some(position.0),
        Some(position.1),
        value(6.5 - 4.5 * d, 0.15),
        value(32.4 + 1.7 * d, 0.05),
        value(2.0 + 33.0 * d, 0.8),
        value(0.3 * (1.0 - d), 0.05),
        value(4.0 + 55.0 * d, 1.5),
        value(0.5 + 2.4 * d, 0.1),
        value(0.4 * (1.0 - d), 0.05),
    ];
    Bottle {
        text,
        closed_at,
        numbers,
        flags: [rng.flag(), rng.flag(), rng.flag()],
    }
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Bottle>> {
    let cruises = [
        ("AR-34", Utc.with_ymd_and_hms(2019, 6, 10, 0, 0, 0)),
        ("AR-39", Utc.with_ymd_and_hms(2020, 1, 20, 0, 0, 0)),
        ("SKQ-21", Utc.with_ymd_and_hms(2021, 5, 3, 0, 0, 0)),
    ];
    let stations = [
        ("S01", "CE01ISSM", (44.66, -124.10), 25.0),
        ("S02", "CE02SHSM", (44.64, -124.30), 80.0),
        ("S03", "CE04OSSM", (44.37, -124.95), 590.0),
    ];
    let niskins = 8;

    let mut bottles = Vec::new();
    for (cruise, start) in cruises {
        let start = start.single().context("invalid cruise start time")?;
        for (station_no, &(station, asset, position, bottom)) in stations.iter().enumerate() {
            let cast_start = start + Duration::hours(9 * station_no as i64);
            for niskin in 0..niskins {
                // Deepest bottle first, as it closes first on the up-cast.
                let depth = bottom * (1.0 - niskin as f64 / niskins as f64) + 1.0;
                let depth = rng.gauss(depth, 0.5).max(1.0);
                let closed_at = cast_start + Duration::minutes(3 * niskin as i64);
                let text = [cruise.to_string(), station.to_string(), asset.to_string()];
                bottles.push(bottle(rng, text, closed_at, position, depth));
            }
        }
    }
    Ok(bottles)
}

fn write_csv(bottles: &[Bottle], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;

    let mut header: Vec<&str> = TEXT_COLUMNS.to_vec();
    header.push(TIME_COLUMN);
    header.extend(NUMERIC_COLUMNS);
    header.extend(FLAG_COLUMNS);
    writer.write_record(&header)?;

    for (i, b) in bottles.iter().enumerate() {
        let mut row: Vec<String> = b.text.to_vec();
        row.push(b.closed_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());
        row.extend(
            b.numbers
                .iter()
                .map(|v| v.map_or(FILL_VALUE.to_string(), |v| format!("{v:.3}"))),
        );
        // Every seventh bottle uses the fill value instead of a blank flag.
        row.extend(b.flags.iter().map(|f| match f {
            Some(code) => code.clone(),
            None if i % 7 == 0 => FILL_VALUE.to_string(),
            None => String::new(),
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(bottles: &[Bottle], path: &str) -> Result<()> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for (i, name) in TEXT_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, false));
        let values: Vec<&str> = bottles.iter().map(|b| b.text[i].as_str()).collect();
        arrays.push(Arc::new(StringArray::from(values)));
    }

    fields.push(Field::new(TIME_COLUMN, DataType::Utf8, false));
    let times: Vec<String> = bottles.iter().map(|b| b.closed_at.to_rfc3339()).collect();
    arrays.push(Arc::new(StringArray::from(times)));

    for (i, name) in NUMERIC_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Float64, true));
        let values: Vec<Option<f64>> = bottles.iter().map(|b| b.numbers[i]).collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }

    for (i, name) in FLAG_COLUMNS.iter().enumerate() {
        fields.push(Field::new(*name, DataType::Utf8, true));
        let values: Vec<Option<&str>> = bottles.iter().map(|b| b.flags[i].as_deref()).collect();
        arrays.push(Arc::new(StringArray::from(values)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let bottles = generate(&mut rng)?;

    write_csv(&bottles, "sample_discrete.csv")?;
    write_parquet(&bottles, "sample_discrete.parquet")?;

    println!(
        "Wrote {} bottles to sample_discrete.csv and sample_discrete.parquet",
        bottles.len()
    );
    Ok(())
}
