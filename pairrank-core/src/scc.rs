/// Strongly connected components of the directed graph behind a CSR matrix.
///
/// An edge `i -> j` exists for every stored off-diagonal entry `(i, j)`.
/// Iterative Tarjan, so deep chains cannot overflow the call stack.
use crate::sparse::CsrMatrix;

const UNVISITED: usize = usize::MAX;

/// Component label per node, plus the number of components.
///
/// Labels are assigned in the order components are completed.
pub fn strongly_connected_components(graph: &CsrMatrix) -> (usize, Vec<usize>) {
    let n = graph.nrows();
    let adj: Vec<Vec<usize>> = (0..n)
        .map(|i| graph.row(i).filter(|&(j, _)| j != i).map(|(j, _)| j).collect())
        .collect();

    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut labels = vec![UNVISITED; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut n_components = 0usize;

    // (node, position of the next neighbour to visit)
    let mut call_stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        call_stack.push((root, 0));
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(v, pos)) = call_stack.last() {
            if pos < adj[v].len() {
                let w = adj[v][pos];
                if let Some(frame) = call_stack.last_mut() {
                    frame.1 += 1;
                }
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call_stack.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    labels[w] = n_components;
                    if w == v {
                        break;
                    }
                }
                n_components += 1;
            }
        }
    }

    (n_components, labels)
}

/// Group node indices by component label, each group in ascending order.
pub fn group_by_component(n_components: usize, labels: &[usize]) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_components];
    for (node, &label) in labels.iter().enumerate() {
        groups[label].push(node);
    }
    groups
}
