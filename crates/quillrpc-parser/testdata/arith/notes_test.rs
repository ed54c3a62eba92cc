// Test-suffixed files are excluded from analysis; this service must never be
// discovered.

pub struct NopeService {
    rpc: quillrpc::Service,
}

impl NopeService {
    pub fn nope(&self) -> i64 {
        0
    }
}
