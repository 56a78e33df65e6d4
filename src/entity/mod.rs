//! SeaORM entity definitions for PostgreSQL database.

pub mod csr_partner;
pub mod csr_partner_toll;
pub mod project;
pub mod real_time_update;
