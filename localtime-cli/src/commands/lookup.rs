//! `localtimed lookup <LAT> <LON>`

use anyhow::{bail, Result};
use clap::Args;

use localtime_core::{Coordinate, TimezoneLookup, TzfLookup};

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Latitude in degrees, -90..=90.
    #[arg(allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in degrees, -180..=180.
    #[arg(allow_negative_numbers = true)]
    pub longitude: f64,
}

impl LookupArgs {
    pub fn run(self) -> Result<()> {
        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if !coordinate.is_valid() {
            bail!("coordinate {coordinate} is out of range");
        }
        match TzfLookup::new().lookup(coordinate) {
            Some(zone) => {
                println!("{zone}");
                Ok(())
            }
            None => bail!("no timezone found for {coordinate}"),
        }
    }
}
