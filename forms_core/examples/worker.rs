use forms_core::*;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::new()?;
    let form = Control::builder(&app)
        .top_level(true)
        .text("Working...")
        .bounds(Rect::new(100, 100, 400, 200))
        .build()?;
    form.create_control()?;

    let invoker = form.invoker();
    let worker = thread::spawn(move || -> Result<()> {
        for step in 1..=5 {
            thread::sleep(Duration::from_millis(200));
            invoker.invoke(move |control, _| control.set_text(&format!("Step {} of 5", step)))??;
        }

        // Recreating the handle does not lose queued work.
        let recreated = invoker.begin_invoke(|control, _| control.recreate_handle())?;
        let title = invoker.begin_invoke(|control, _| control.text())?;
        invoker.end_invoke(recreated)??;
        println!("title after recreation: {}", invoker.end_invoke(title)?);

        invoker.post(|control| control.platform().post_quit(0))?;
        Ok(())
    });

    let exit_code = app.run();
    worker
        .join()
        .expect("worker thread panicked")?;
    println!("exit code {}", exit_code);
    Ok(())
}
