#![allow(dead_code)]

pub const PLAYLIST_1_ID: &str = "37i9dQZF1DXcBWIGoYBM5M";
pub const PLAYLIST_1_NAME: &str = "Today's Top Hits";
pub const PLAYLIST_2_ID: &str = "37i9dQZF1DX4sWSpwq3LiO";
pub const PLAYLIST_2_NAME: &str = "Peaceful Piano";

pub const IMAGE_1_URL: &str = "https://i.scdn.co/image/ab67706f00000002aaaa1111";
pub const IMAGE_2_URL: &str = "https://i.scdn.co/image/ab67706f00000002bbbb2222";

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
