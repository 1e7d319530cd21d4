use flowtag::app::Application;

fn main() {
    let code = match Application::prepare() {
        Ok(app) => app.run_to_exit_code(),
        Err(code) => code,
    };

    std::process::exit(code);
}
