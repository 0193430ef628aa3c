//! Generated gRPC messages and service stubs for the fleet ingest/query
//! surface (`proto/fleet.proto`). Nothing hand-written lives here; this
//! crate exists only to give `fleet-manager` and `fleet-worker` a shared
//! wire contract without either depending on the other.

tonic::include_proto!("fleet");
