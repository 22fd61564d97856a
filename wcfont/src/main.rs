use std::{fs, io::Write, path::Path};

use clap::Parser;
use log::info;
use wcfont::{
    css::{font_face_css, loader_js},
    Config, Error, FontService,
};

mod args;

use args::{parse_batch, Args};

fn content(args: &Args) -> Result<String, Error> {
    match (&args.content, &args.content_file) {
        (Some(content), _) => Ok(content.clone()),
        (None, Some(path)) => fs::read_to_string(path).map_err(|source| Error::FileIo {
            path: path.clone(),
            source,
        }),
        (None, None) => Ok(String::new()),
    }
}

fn render(args: &Args, family: &str, file_name: &str) -> String {
    if args.css {
        font_face_css(family, &args.url_prefix, file_name)
    } else {
        file_name.to_string()
    }
}

fn run_batch(service: &FontService, args: &Args, batch: &Path) -> Result<(), Error> {
    let input = fs::read_to_string(batch).map_err(|source| Error::FileIo {
        path: batch.to_path_buf(),
        source,
    })?;
    let requests = parse_batch(&input);
    info!("Processing {} requests from {batch:?}", requests.len());
    let results = service.get_or_create_all(&requests);

    let mut out = std::io::stdout().lock();
    for ((family, _), result) in requests.iter().zip(results) {
        let line = match result {
            // one line per request, so keep the css on one line too
            Ok(file_name) => render(args, family, &file_name).replace('\n', " "),
            Err(e) => format!("error\t{:?}\t{e}", e.kind()),
        };
        writeln!(out, "{line}").map_err(|source| Error::FileIo {
            path: "<stdout>".into(),
            source,
        })?;
    }
    let stats = service.stats();
    info!(
        "{} pipeline runs, {} already present, {} failed",
        stats.runs,
        stats.hits,
        stats.failures
    );
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::builder()
        .format(|buf, record| {
            let ts = buf.timestamp_micros();
            writeln!(
                buf,
                "{}: {:?}: {}: {}",
                ts,
                std::thread::current().id(),
                record.level(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    if let (Some(selector), Some(family)) = (&args.loader, &args.family) {
        println!("{}", loader_js(selector, family));
        return Ok(());
    }

    let config = Config::discover(args.config.as_deref())?
        .with_overrides(args.input_dir.clone(), args.output_dir.clone());
    let service = FontService::new(config)?;

    if let Some(batch) = &args.batch {
        return run_batch(&service, &args, batch);
    }

    // clap insists on a family when there's no batch
    let family = args.family.as_deref().unwrap_or_default();
    let file_name = service.get_or_create(family, &content(&args)?)?;
    println!("{}", render(&args, family, &file_name));
    Ok(())
}
