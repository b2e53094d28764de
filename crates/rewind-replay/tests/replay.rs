use std::fs::File;
use std::io::{BufReader, Write};

use pretty_assertions::assert_eq;
use rewind_atom::AtomId;
use rewind_replay::{read_atoms, run_pass, write_atoms, ReplayConfig};

const STREAM: &str = r#"{"cmd":{"call":"eglCreateContext","context":1,"major_version":3,"minor_version":0}}
{"cmd":{"call":"eglCreateWindowSurface","surface":1,"width":64,"height":48}}
{"cmd":{"call":"eglMakeCurrent","draw":1,"read":1,"context":1}}
{"cmd":{"call":"glEnable","cap":"DepthTest"}}
{"cmd":{"call":"glDrawArrays","mode":"Triangles","first":0,"count":3}}
{"cmd":{"call":"eglSwapBuffers","surface":1}}
{"cmd":{"call":"glDrawArrays","mode":"Triangles","first":0,"count":3}}
{"cmd":{"call":"eglSwapBuffers","surface":1}}
"#;

fn stream_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(STREAM.as_bytes()).unwrap();
    file
}

fn load(config: &ReplayConfig) -> Vec<rewind_atom::Atom<rewind_gles::Cmd>> {
    read_atoms(BufReader::new(File::open(&config.input).unwrap())).unwrap()
}

#[test]
fn plain_pass_reproduces_the_stream() {
    let input = stream_file();
    let config = ReplayConfig::new(input.path());
    let atoms = load(&config);
    let replay = run_pass(&config, atoms.clone()).unwrap();
    assert_eq!(replay.stats.atoms_in, 8);
    assert_eq!(replay.output, atoms);
    assert_eq!(replay.synthesized(), 0);

    let ctx = replay.state.api.current_context().unwrap();
    assert!(ctx.info.initialized);
    assert_eq!(ctx.rasterization.viewport.width, 64);
}

#[test]
fn undefined_framebuffer_changes_the_digest_but_not_the_state() {
    let input = stream_file();
    let mut config = ReplayConfig::new(input.path());
    let plain = run_pass(&config, load(&config)).unwrap();

    config.undefined_framebuffer = true;
    let patterned = run_pass(&config, load(&config)).unwrap();
    assert!(patterned.synthesized() > 0);
    assert_ne!(patterned.digest().unwrap(), plain.digest().unwrap());
    assert_eq!(patterned.state.api, plain.state.api);
}

#[test]
fn stop_after_truncates_the_output() {
    let input = stream_file();
    let mut config = ReplayConfig::new(input.path());
    config.stop_after = Some(4);
    let replay = run_pass(&config, load(&config)).unwrap();
    assert_eq!(replay.stats.atoms_in, 8);
    assert_eq!(replay.output.len(), 5);
    assert_eq!(replay.output.last().map(|a| a.id), Some(AtomId(4)));
}

#[test]
fn written_output_reads_back_identically() {
    let input = stream_file();
    let mut config = ReplayConfig::new(input.path());
    config.undefined_framebuffer = true;
    let replay = run_pass(&config, load(&config)).unwrap();

    let out = tempfile::NamedTempFile::new().unwrap();
    write_atoms(File::create(out.path()).unwrap(), &replay.output).unwrap();
    let back = read_atoms(BufReader::new(File::open(out.path()).unwrap())).unwrap();
    // Synthesized atoms come back numbered by line.
    assert_eq!(back.len(), replay.output.len());
    for (line, (a, b)) in back.iter().zip(&replay.output).enumerate() {
        assert_eq!(a.cmd, b.cmd);
        assert_eq!(a.observations, b.observations);
        if !b.id.is_none() {
            assert_eq!(a.id, b.id);
        } else {
            assert_eq!(a.id, AtomId(line as u64));
        }
    }
}

#[test]
fn fatal_errors_report_the_atom() {
    let text = format!("{STREAM}{}\n", r#"{"cmd":{"call":"glDeleteBuffers","count":1,"buffers":16}}"#);
    let atoms = read_atoms(text.as_bytes()).unwrap();
    let config = ReplayConfig::new("unused.jsonl");
    let err = run_pass(&config, atoms).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("atom 8"), "{message}");
}
