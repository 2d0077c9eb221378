// Domain layer: the ledger's data model and the ports its collaborators implement.

pub mod model;
pub mod ports;
