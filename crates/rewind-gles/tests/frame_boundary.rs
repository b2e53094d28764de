use pretty_assertions::assert_eq;
use rewind_atom::{Atom, AtomId, Command, Observation, Pointer, DEFAULT_TEMP_BASE};
use rewind_gles::types::*;
use rewind_gles::{Cmd, Gles, UndefinedFramebuffer};
use rewind_transform::id::seed_for;
use rewind_transform::{Recorder, State, Transforms, Writer};

const SURFACE: SurfaceId = SurfaceId(1);
const CONTEXT: ContextId = ContextId(1);

fn frames(major: u32, count: usize) -> Vec<Atom<Cmd>> {
    let mut cmds = vec![
        Cmd::EglCreateContext {
            context: CONTEXT,
            major_version: major,
            minor_version: 0,
        },
        Cmd::EglCreateWindowSurface {
            surface: SURFACE,
            width: 128,
            height: 96,
        },
        Cmd::EglMakeCurrent {
            draw: SURFACE,
            read: SURFACE,
            context: CONTEXT,
        },
        Cmd::GlEnable {
            cap: Capability::DepthTest,
        },
        Cmd::GlEnable {
            cap: Capability::Blend,
        },
        // Application names sitting on the other kind's seed.
        Cmd::GlCreateProgram {
            result: ProgramId(seed_for('S')),
        },
        Cmd::GlCreateShader {
            ty: ShaderType::Vertex,
            result: ShaderId(seed_for('P')),
        },
        Cmd::GlUseProgram {
            program: ProgramId(seed_for('S')),
        },
        Cmd::GlEnableVertexAttribArray { location: 2 },
    ];
    for _ in 0..count {
        cmds.push(Cmd::GlDrawArrays {
            mode: DrawMode::Triangles,
            first: 0,
            count: 3,
        });
        cmds.push(Cmd::EglSwapBuffers { surface: SURFACE });
    }
    cmds.into_iter()
        .enumerate()
        .map(|(i, cmd)| Atom::with_id(AtomId(i as u64), cmd))
        .collect()
}

fn run(atoms: Vec<Atom<Cmd>>, undefined_framebuffer: bool) -> Recorder<Gles> {
    let mut transforms = Transforms::<Gles>::new();
    if undefined_framebuffer {
        transforms.add(UndefinedFramebuffer::new());
    }
    let mut out = Recorder::new(State::default(), Default::default());
    transforms.transform(atoms, &mut out).unwrap();
    out
}

fn count(out: &Recorder<Gles>, name: &str) -> usize {
    out.output().iter().filter(|a| a.cmd.name() == name).count()
}

#[test]
fn empty_pipeline_preserves_the_stream() {
    let atoms = frames(3, 2);
    let out = run(atoms.clone(), false);
    assert_eq!(out.output(), &atoms[..]);
}

#[test]
fn pattern_is_drawn_on_first_bind_and_every_destroying_swap() {
    for major in [2, 3] {
        let out = run(frames(major, 3), true);
        // Three application draws, one pattern for the first bind, one per swap.
        assert_eq!(count(&out, "glDrawArrays"), 3 + 1 + 3);
    }
}

#[test]
fn application_atoms_keep_their_order() {
    let atoms = frames(2, 2);
    let out = run(atoms.clone(), true);
    let passed: Vec<_> = out
        .output()
        .iter()
        .filter(|a| !a.id.is_none())
        .cloned()
        .collect();
    assert_eq!(passed, atoms);
}

#[test]
fn synthesized_rendering_leaves_no_trace_in_state() {
    for major in [2, 3] {
        let plain = run(frames(major, 2), false);
        let patterned = run(frames(major, 2), true);
        assert_eq!(patterned.state().api, plain.state().api);
        assert_eq!(patterned.allocator_ref().live_count(), 0);
    }
}

#[test]
fn pattern_follows_the_swap() {
    let out = run(frames(3, 1), true);
    let swap = out
        .output()
        .iter()
        .position(|a| a.flags.is_end_of_frame())
        .unwrap();
    let after: Vec<_> = out.output()[swap + 1..].iter().map(|a| a.cmd.name()).collect();
    assert_eq!(after.first(), Some(&"glDisable"));
    assert!(after.contains(&"glDrawArrays"));
    assert!(out.output()[swap + 1..].iter().all(|a| a.id.is_none()));
}

#[test]
fn vertex_array_strategy_depends_on_the_version() {
    let gles2 = run(frames(2, 1), true);
    let gles3 = run(frames(3, 1), true);
    assert_eq!(count(&gles2, "glGenVertexArrays"), 0);
    assert_eq!(count(&gles3, "glGenVertexArrays"), 2);
    // GLES 2 edits the default vertex array: location 0 is switched off again after both
    // patterns, and the application's location 2 is switched off for the swap pattern.
    assert_eq!(count(&gles2, "glDisableVertexAttribArray"), 3);
    assert_eq!(count(&gles3, "glDisableVertexAttribArray"), 0);
}

#[test]
fn synthesized_programs_and_shaders_share_one_namespace() {
    let out = run(frames(2, 1), true);
    let swap = out
        .output()
        .iter()
        .position(|a| a.flags.is_end_of_frame())
        .unwrap();
    let mut names = vec![seed_for('S'), seed_for('P')];
    for atom in &out.output()[swap + 1..] {
        match &atom.cmd {
            Cmd::GlCreateProgram { result } => names.push(result.0),
            Cmd::GlCreateShader { result, .. } => names.push(result.0),
            _ => {}
        }
    }
    assert_eq!(
        names[2..].to_vec(),
        vec![seed_for('P') + 1, seed_for('S') + 1, seed_for('S') + 2]
    );
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn temporary_buffers_come_from_the_temp_arena() {
    let out = run(frames(3, 1), true);
    let (data, reads) = out
        .output()
        .iter()
        .find_map(|a| match a.cmd {
            Cmd::GlBufferData { data, .. } => Some((data, a.observations.reads.clone())),
            _ => None,
        })
        .unwrap();
    assert!(data.0 >= DEFAULT_TEMP_BASE);
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].range.base, data.0);
    assert_eq!(reads[0].data.len(), 32);
}

#[test]
fn unobserved_memory_is_reported_with_its_position() {
    let mut atoms = frames(3, 0);
    let id = AtomId(atoms.len() as u64);
    atoms.push(Atom::with_id(
        id,
        Cmd::GlDeleteBuffers {
            count: 1,
            buffers: Pointer(0x10),
        },
    ));
    let mut transforms = Transforms::<Gles>::new();
    transforms.add(UndefinedFramebuffer::new());
    let mut out = Recorder::new(State::default(), Default::default());
    let err = transforms.transform(atoms, &mut out).unwrap_err();
    assert_eq!(err.atom_id(), Some(id));

    // The same delete with its read observation goes through.
    let ok = Atom::new(Cmd::GlDeleteBuffers {
        count: 1,
        buffers: Pointer(0x10),
    })
    .with_read(Observation::at(Pointer(0x10), 0u32.to_le_bytes().to_vec()));
    out.mutate_and_write(ok).unwrap();
}
