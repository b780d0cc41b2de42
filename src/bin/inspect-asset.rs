use std::fs;
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Matrix4;
use rigasset::model::AssetModel;
use rigasset::{compute_mesh_to_bone_transforms, compute_world_transforms, parse_asset};
use rigasset::resolve_vertex_influences;
use rigasset::transform::skinning_matrices;

#[derive(Parser)]
#[command(name = "inspect-asset")]
#[command(about = "Parse a rigged asset file and print what it contains")]
#[command(version)]
struct Cli {
    /// Asset file to read
    input: PathBuf,

    /// Print the resolved bone influences of every vertex
    #[arg(long)]
    influences: bool,

    /// Print bind-pose world matrices of nodes and bones
    #[arg(long)]
    transforms: bool,
}

/// Print each tree of a forest as an indented outline.
fn print_tree<'m>(
    roots: impl Iterator<Item = usize>,
    children: impl Fn(usize) -> &'m [usize],
    label: impl Fn(usize) -> String,
) {
    let mut stack = roots.map(|r| (r, 1)).collect::<Vec<_>>();
    stack.reverse();
    while let Some((i, depth)) = stack.pop() {
        println!("{1:0$}{2}", depth * 2, "", label(i));
        for &c in children(i).iter().rev() {
            stack.push((c, depth + 1));
        }
    }
}

fn print_matrix(label: &str, m: &Matrix4<f32>) {
    println!("  {}:", label);
    for r in 0 .. 4 {
        println!("    [{:9.4} {:9.4} {:9.4} {:9.4}]", m[(r, 0)], m[(r, 1)], m[(r, 2)], m[(r, 3)]);
    }
}

fn print_report(model: &AssetModel, cli: &Cli) -> Result<()> {
    println!(
        "asset has {} nodes, {} bones, {} meshes",
        model.nodes().len(),
        model.bones().len(),
        model.meshes().len(),
    );

    println!("node hierarchy:");
    print_tree(model.node_roots(), |i| model.node_children(i), |i| {
        let n = &model.nodes()[i];
        match n.mesh {
            Some(m) => format!("{} (mesh {:?})", n.name, model.meshes()[m].name),
            None => n.name.clone(),
        }
    });

    println!("bone hierarchy:");
    print_tree(model.bone_roots(), |i| model.bone_children(i), |i| model.bones()[i].name.clone());

    for (i, m) in model.meshes().iter().enumerate() {
        let owner = match model.mesh_owner(i) {
            Some(n) => model.nodes()[n].name.as_str(),
            None => "<none>",
        };
        println!(
            "mesh {:?}: {} verts, {} tris, bones {:?}, owned by {}",
            m.name, m.vertex_count(), m.tris.len(), m.bone_range(), owner,
        );
    }

    if cli.transforms {
        let world = compute_world_transforms(model);
        for (n, w) in model.nodes().iter().zip(&world.nodes) {
            print_matrix(&format!("node {}", n.name), w);
        }
        for (b, w) in model.bones().iter().zip(&world.bones) {
            print_matrix(&format!("bone {}", b.name), w);
        }
        for m in model.meshes() {
            let inv = compute_mesh_to_bone_transforms(m, &world.bones)
                .with_context(|| format!("mesh {:?}", m.name))?;
            for (b, w) in m.bone_range().zip(&inv) {
                print_matrix(&format!("mesh {} to bone {}", m.name, model.bones()[b].name), w);
            }
            // Skinning the bind pose should give back the identity.
            let drift = skinning_matrices(m, &inv, &world.bones)
                .iter()
                .map(|s| (s - Matrix4::identity()).amax())
                .fold(0., f32::max);
            println!("  mesh {} bind-pose skinning drift: {:.3e}", m.name, drift);
        }
    }

    if cli.influences {
        for m in model.meshes() {
            println!("influences for mesh {:?}:", m.name);
            let inf = resolve_vertex_influences(m);
            for v in 0 .. inf.vertex_count() {
                let slots = inf.vertex(v)
                    .filter(|&(_, w)| w != 0.)
                    .map(|(b, w)| format!("{}={:.4}", model.bones()[m.bone_base + b as usize].name, w))
                    .collect::<Vec<_>>();
                println!("  {:5}: {}", v, slots.join(" "));
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let buf = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let model = parse_asset(&buf)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;
    print_report(&model, &cli)
}
