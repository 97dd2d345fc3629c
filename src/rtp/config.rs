pub const RTP_VERSION: u8 = 2;
