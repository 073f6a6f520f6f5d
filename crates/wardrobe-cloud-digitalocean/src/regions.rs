//! DigitalOcean regions offered for VPN deployments

/// A datacenter region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub slug: &'static str,
    pub label: &'static str,
}

pub const REGIONS: &[Region] = &[
    Region { slug: "lon1", label: "London, UK" },
    Region { slug: "ams3", label: "Amsterdam, Netherlands" },
    Region { slug: "nyc1", label: "New York, USA 1" },
    Region { slug: "nyc2", label: "New York, USA 2" },
    Region { slug: "nyc3", label: "New York, USA 3" },
    Region { slug: "sfo2", label: "San Francisco, USA 2" },
    Region { slug: "sfo3", label: "San Francisco, USA 3" },
    Region { slug: "sgp1", label: "Singapore" },
    Region { slug: "fra1", label: "Frankfurt, Germany" },
    Region { slug: "tor1", label: "Toronto, Canada" },
    Region { slug: "blr1", label: "Bangalore, India" },
    Region { slug: "syd1", label: "Sydney, Australia" },
    Region { slug: "atl1", label: "Atlanta, USA" },
];

/// Look up a region by slug (case-insensitive)
pub fn find_region(slug: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.slug.eq_ignore_ascii_case(slug))
}

pub fn is_known_region(slug: &str) -> bool {
    find_region(slug).is_some()
}
