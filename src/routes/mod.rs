use rocket::fairing::AdHoc;

pub mod dag_runs;

pub fn mount() -> AdHoc {
    AdHoc::on_ignite("Attaching Routes", |rocket| async {
        rocket.mount(
            "/",
            routes![dag_runs::mainnet, dag_runs::devnet, dag_runs::loadnet],
        )
    })
}
