use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wildcard accepted wherever a region name is expected.
pub const ALL_REGIONS: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    ArabianSea,
    BayOfBengal,
    IndianOcean,
    NorthPacific,
    SouthPacific,
    NorthAtlantic,
    SouthAtlantic,
    SouthernOcean,
    ArcticOcean,
    Mediterranean,
    SouthChinaSea,
    Caribbean,
    RedSea,
    PersianGulf,
    Unknown,
}

impl Region {
    /// Every named region, in the order the synthetic generator walks them.
    pub const NAMED: [Region; 14] = [
        Region::ArabianSea,
        Region::BayOfBengal,
        Region::IndianOcean,
        Region::NorthPacific,
        Region::SouthPacific,
        Region::NorthAtlantic,
        Region::SouthAtlantic,
        Region::SouthernOcean,
        Region::ArcticOcean,
        Region::Mediterranean,
        Region::SouthChinaSea,
        Region::Caribbean,
        Region::RedSea,
        Region::PersianGulf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Region::ArabianSea => "Arabian Sea",
            Region::BayOfBengal => "Bay of Bengal",
            Region::IndianOcean => "Indian Ocean",
            Region::NorthPacific => "North Pacific",
            Region::SouthPacific => "South Pacific",
            Region::NorthAtlantic => "North Atlantic",
            Region::SouthAtlantic => "South Atlantic",
            Region::SouthernOcean => "Southern Ocean",
            Region::ArcticOcean => "Arctic Ocean",
            Region::Mediterranean => "Mediterranean",
            Region::SouthChinaSea => "South China Sea",
            Region::Caribbean => "Caribbean",
            Region::RedSea => "Red Sea",
            Region::PersianGulf => "Persian Gulf",
            Region::Unknown => "Unknown Region",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Region::NAMED
            .iter()
            .chain(std::iter::once(&Region::Unknown))
            .find(|r| r.name().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("Unknown region '{}'", s))
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Region selector supplied by callers: one named region or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum RegionQuery {
    #[default]
    All,
    Named(Region),
}

impl RegionQuery {
    pub fn region(&self) -> Option<Region> {
        match self {
            RegionQuery::All => None,
            RegionQuery::Named(r) => Some(*r),
        }
    }
}

impl FromStr for RegionQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_REGIONS) {
            return Ok(RegionQuery::All);
        }
        match s.parse::<Region>()? {
            Region::Unknown => Err("'Unknown Region' cannot be requested".to_string()),
            named => Ok(RegionQuery::Named(named)),
        }
    }
}

impl TryFrom<String> for RegionQuery {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RegionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionQuery::All => f.write_str(ALL_REGIONS),
            RegionQuery::Named(r) => r.fmt(f),
        }
    }
}

/// Inclusive latitude/longitude rectangle in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }
}

// Regional seas come before the basins that enclose them; first match wins.
const REGION_BOXES: &[(Region, BoundingBox)] = &[
    (Region::PersianGulf, BoundingBox::new(23.5, 30.5, 47.5, 56.5)),
    (Region::RedSea, BoundingBox::new(12.0, 30.0, 32.0, 43.5)),
    (Region::Mediterranean, BoundingBox::new(30.0, 46.0, -6.0, 36.5)),
    (Region::ArabianSea, BoundingBox::new(0.0, 25.0, 50.0, 77.0)),
    (Region::BayOfBengal, BoundingBox::new(5.0, 23.0, 80.0, 95.0)),
    (Region::SouthChinaSea, BoundingBox::new(0.0, 23.0, 99.0, 121.0)),
    (Region::Caribbean, BoundingBox::new(9.0, 22.0, -88.0, -60.0)),
    (Region::ArcticOcean, BoundingBox::new(66.0, 90.0, -180.0, 180.0)),
    (Region::SouthernOcean, BoundingBox::new(-78.0, -50.0, -180.0, 180.0)),
    (Region::IndianOcean, BoundingBox::new(-50.0, 25.0, 20.0, 120.0)),
    (Region::NorthAtlantic, BoundingBox::new(0.0, 66.0, -80.0, 0.0)),
    (Region::SouthAtlantic, BoundingBox::new(-50.0, 0.0, -70.0, 20.0)),
    (Region::NorthPacific, BoundingBox::new(0.0, 66.0, 120.0, 180.0)),
    (Region::NorthPacific, BoundingBox::new(0.0, 66.0, -180.0, -80.0)),
    (Region::SouthPacific, BoundingBox::new(-50.0, 0.0, 120.0, 180.0)),
    (Region::SouthPacific, BoundingBox::new(-50.0, 0.0, -180.0, -70.0)),
];

// Continental interiors. Coastlines are deliberately left outside.
const LAND_INTERIORS: &[BoundingBox] = &[
    BoundingBox::new(30.0, 60.0, -115.0, -85.0),  // North America
    BoundingBox::new(-30.0, 2.0, -70.0, -42.0),   // South America
    BoundingBox::new(5.0, 15.0, -5.0, 35.0),      // West and Central Africa
    BoundingBox::new(-25.0, 5.0, 12.0, 35.0),     // Southern Africa
    BoundingBox::new(15.0, 30.0, -10.0, 30.0),    // Sahara
    BoundingBox::new(45.0, 54.0, 5.0, 25.0),      // Central Europe
    BoundingBox::new(48.0, 70.0, 30.0, 140.0),    // Northern Eurasia
    BoundingBox::new(30.0, 48.0, 50.0, 120.0),    // Central Asia
    BoundingBox::new(15.0, 25.0, 74.0, 82.0),     // Indian subcontinent
    BoundingBox::new(17.0, 24.0, 44.0, 55.0),     // Arabian peninsula
    BoundingBox::new(-32.0, -18.0, 117.0, 150.0), // Australia
    BoundingBox::new(-90.0, -70.0, -180.0, 180.0), // Antarctica
    BoundingBox::new(60.0, 81.0, -50.0, -25.0),   // Greenland
    BoundingBox::new(22.0, 40.0, 100.0, 118.0),   // Eastern China
];

/// Name the region a point belongs to.
///
/// A concrete `requested` region is returned unchanged; only the wildcard
/// triggers a lookup, which walks the box table in order and then falls back
/// to latitude bands.
pub fn classify(lat: f64, lon: f64, requested: RegionQuery) -> Region {
    if let RegionQuery::Named(region) = requested {
        return region;
    }

    if let Some((region, _)) = REGION_BOXES.iter().find(|(_, b)| b.contains(lat, lon)) {
        return *region;
    }

    if lat > 66.0 {
        Region::ArcticOcean
    } else if lat < -40.0 {
        Region::SouthernOcean
    } else {
        Region::Unknown
    }
}

/// Advisory land filter used before drawing markers. Coastal points may pass.
pub fn is_water_location(lat: f64, lon: f64) -> bool {
    if !lat.is_finite() || !lon.is_finite() {
        return false;
    }
    !LAND_INTERIORS.iter().any(|b| b.contains(lat, lon))
}

/// Every classification box listed for `region`, used for ERDDAP query constraints.
///
/// Basins crossing the antimeridian have one box on each side.
pub fn classification_boxes(region: Region) -> Vec<BoundingBox> {
    REGION_BOXES
        .iter()
        .filter(|(r, _)| *r == region)
        .map(|(_, b)| *b)
        .collect()
}
