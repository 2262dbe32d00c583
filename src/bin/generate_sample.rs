use anyhow::{Context, Result};

/// Minimal deterministic PRNG (splitmix64)
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    /// Weighted pick: index into `weights` proportional to each entry.
    fn pick_weighted(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        let mut roll = self.below(total as u64) as u32;
        for (i, &w) in weights.iter().enumerate() {
            if roll < w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }
}

const STREETS: [&str; 12] = [
    "BROADWAY",
    "5TH AVE",
    "QUEENS BLVD",
    "ATLANTIC AVE",
    "FLATBUSH AVE",
    "GRAND CONCOURSE",
    "DELANCEY ST",
    "CANAL ST",
    "OCEAN PKWY",
    "NORTHERN BLVD",
    "LINDEN BLVD",
    "EASTERN PKWY",
];

const BOROUGHS: [&str; 5] = ["MANHATTAN", "BROOKLYN", "QUEENS", "BRONX", "STATEN ISLAND"];

// Collisions per hour of day, roughly bimodal around the commutes.
const HOUR_WEIGHTS: [u32; 24] = [
    2, 1, 1, 1, 1, 2, 4, 7, 9, 7, 6, 6, 7, 7, 8, 9, 10, 11, 9, 7, 5, 4, 3, 2,
];

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);
    let rows = 2_000;
    let output_path = "sample_collisions.csv";

    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record([
        "CRASH_DATE",
        "CRASH_TIME",
        "BOROUGH",
        "LATITUDE",
        "LONGITUDE",
        "INJURED_PERSONS",
        "INJURED_PEDESTRIANS",
        "INJURED_CYCLISTS",
        "INJURED_MOTORISTS",
        "ON_STREET_NAME",
    ])?;

    let mut complete = 0;
    for _ in 0..rows {
        // One synthetic month of crashes.
        let day = 1 + rng.below(28);
        let hour = rng.pick_weighted(&HOUR_WEIGHTS);
        let minute = rng.below(60);

        // Scatter positions around the city center.
        let latitude = 40.58 + rng.next_f64() * 0.30;
        let longitude = -74.10 + rng.next_f64() * 0.35;

        // Most crashes injure nobody; a few injure several people, split
        // across the three road-user categories.
        let pedestrians = [0, 0, 0, 0, 0, 0, 1, 1, 2, 3][rng.below(10) as usize];
        let cyclists = [0, 0, 0, 0, 0, 0, 0, 1, 1, 2][rng.below(10) as usize];
        let motorists = [0, 0, 0, 0, 1, 1, 1, 2, 3, 5][rng.below(10) as usize];
        let persons = pedestrians + cyclists + motorists;

        // The real export has holes; leave some.
        let drop_coords = rng.below(100) < 7;
        let drop_street = rng.below(100) < 20;
        if !drop_coords {
            complete += 1;
        }

        let coord = |v: f64| if drop_coords { String::new() } else { format!("{v:.6}") };
        writer.write_record([
            format!("03/{day:02}/2019"),
            format!("{hour:02}:{minute:02}"),
            BOROUGHS[rng.below(BOROUGHS.len() as u64) as usize].to_string(),
            coord(latitude),
            coord(longitude),
            persons.to_string(),
            pedestrians.to_string(),
            cyclists.to_string(),
            motorists.to_string(),
            if drop_street {
                String::new()
            } else {
                STREETS[rng.below(STREETS.len() as u64) as usize].to_string()
            },
        ])?;
    }

    writer.flush().context("flushing sample file")?;
    println!("Wrote {rows} collisions ({complete} with coordinates) to {output_path}");
    Ok(())
}
