/// AWS regions where Amazon Connect is available, with display names.
pub const CONNECT_REGIONS: &[(&str, &str)] = &[
    ("us-east-1", "N. Virginia"),
    ("us-west-2", "Oregon"),
    ("ap-northeast-1", "Tokyo"),
    ("ap-northeast-2", "Seoul"),
    ("ap-southeast-1", "Singapore"),
    ("ap-southeast-2", "Sydney"),
    ("eu-central-1", "Frankfurt"),
    ("eu-west-2", "London"),
    ("af-south-1", "Cape Town"),
    ("ca-central-1", "Canada Central"),
];

pub const DEFAULT_REGION: &str = "us-east-1";

pub fn is_supported_region(region: &str) -> bool {
    CONNECT_REGIONS.iter().any(|(code, _)| *code == region)
}

/// e.g. "us-west-2 (Oregon)"
pub fn display_name(region: &str) -> Option<String> {
    CONNECT_REGIONS
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(code, name)| format!("{code} ({name})"))
}
