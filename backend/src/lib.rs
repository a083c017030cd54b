pub mod catchers;
pub mod clock;
pub mod config;
pub mod cors;
pub mod error;
pub mod maintenance;
pub mod pg_store;
pub mod processor;
pub mod rate_limiter;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::{models::*, error::*, user_info::*};

use rocket::{catchers, routes, Build, Rocket};

use crate::catchers::{bad_request, forbidden, internal_error, not_found, too_many_requests, unprocessable};
use crate::cors::Cors;
use crate::routes::{
    all_options, check_maintenance, get_clock, get_votes, health, list_nominees, reset_votes,
    set_maintenance, submit_vote, AppState,
};

pub fn build_rocket(state: AppState, allowed_origins: Vec<String>) -> Rocket<Build> {
    rocket::build()
        .attach(Cors::new(allowed_origins))
        .manage(state)
        .mount(
            "/api",
            routes![
                get_votes,
                submit_vote,
                reset_votes,
                list_nominees,
                get_clock,
                check_maintenance,
                set_maintenance,
                health,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                forbidden,
                not_found,
                unprocessable,
                too_many_requests,
                internal_error
            ],
        )
}
