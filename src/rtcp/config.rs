pub const RTCP_VERSION: u8 = 2;
