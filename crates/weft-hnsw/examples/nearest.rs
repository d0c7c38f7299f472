//! Minimal usage: three vectors, one query.

use weft_hnsw::{make_nodes, Graph};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let graph: Graph<i32> = Graph::default();

    let keys = vec![1, 2, 3];
    let values = vec![
        vec![1.0, 1.0, 1.0],
        vec![1.0, -1.0, 0.999],
        vec![1.0, 0.0, -0.5],
    ];
    graph.add(make_nodes(keys, values)?)?;

    let neighbors = graph.search(&[0.5, 0.5, 0.5], 1)?;
    println!("best friend: {:?}", neighbors[0].value);

    Ok(())
}
