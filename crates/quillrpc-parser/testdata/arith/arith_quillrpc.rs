// Code generated by quillrpc-gen. DO NOT EDIT.

// Stale generated output left in place on purpose: the analyzer must skip
// files with the generated suffix to avoid parsing its own output.

pub struct StaleService {
    rpc: quillrpc::Service,
}
