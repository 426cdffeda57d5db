mod application;

mod presentation {
    pub mod cli;
}

fn main() -> tlx_core::error::Result<()> {
    application::run()
}
