pub const DEV: &str = sev_ioctl::DEV;
pub const OUT_DIR: &str = ".";

pub const PEK_CSR_FILE: &str = "pek_csr.cert";
pub const PDH_CERT_CHAIN_FILE: &str = "pdh_cert_chain.cert";
pub const PEK_CERT_CHAIN_FILE: &str = "pek_cert_chain.cert";
pub const GET_ID_FILE: &str = "getid.bin";
