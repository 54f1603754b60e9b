// leaf_tree.rs — Containers shaped like a Type
//
// A `LeafTree<T>` mirrors a `Type`'s shape and holds exactly one `T` per
// scalar leaf, stored as a flat vector in depth-first left-to-right order.
// All operations are pure and know nothing about the node graph. Shape
// mismatches are programmer errors and panic; the analysis engine validates
// graph-level shape agreement before these operations run.

use crate::ty::Type;

/// One payload per scalar leaf of a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTree<T> {
    ty: Type,
    leaves: Vec<T>,
}

impl<T> LeafTree<T> {
    /// Construct a tree by producing each leaf from its own path. This is
    /// the only leaf-by-leaf constructor.
    pub fn build(ty: Type, mut f: impl FnMut(&[usize], &Type) -> T) -> LeafTree<T> {
        let mut leaves = Vec::with_capacity(ty.leaf_count());
        let mut path = Vec::new();
        fill(&ty, &mut path, &mut leaves, &mut f);
        LeafTree { ty, leaves }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// The leaf addressed by a full structural path.
    pub fn get(&self, path: &[usize]) -> &T {
        let (offset, sub) = self.locate(path);
        assert!(sub.is_bits(), "path does not address a leaf of {}", self.ty);
        &self.leaves[offset]
    }

    pub fn get_mut(&mut self, path: &[usize]) -> &mut T {
        let (offset, sub) = self.locate(path);
        assert!(sub.is_bits(), "path does not address a leaf of {}", self.ty);
        &mut self.leaves[offset]
    }

    /// All `(path, leaf)` pairs in canonical depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = (Vec<usize>, &T)> {
        leaf_paths(&self.ty).into_iter().zip(self.leaves.iter())
    }

    /// Element-wise combine with another tree of identical shape.
    pub fn zip_with<U, V>(&self, other: &LeafTree<U>, mut f: impl FnMut(&T, &U) -> V) -> LeafTree<V> {
        assert_eq!(
            self.ty, other.ty,
            "zip_with requires identically shaped trees"
        );
        LeafTree {
            ty: self.ty.clone(),
            leaves: self
                .leaves
                .iter()
                .zip(other.leaves.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }

    /// Flat offset and subtype addressed by a path prefix.
    fn locate(&self, path: &[usize]) -> (usize, &Type) {
        let mut ty = &self.ty;
        let mut offset = 0;
        for &i in path {
            assert!(
                i < ty.child_count(),
                "path step {i} out of range for {ty} (in {})",
                self.ty
            );
            match ty {
                Type::Tuple(fields) => {
                    offset += fields[..i].iter().map(Type::leaf_count).sum::<usize>();
                    ty = &fields[i];
                }
                Type::Array { element, .. } => {
                    offset += element.leaf_count() * i;
                    ty = element;
                }
                Type::Bits(_) => unreachable!("child_count is 0 for scalars"),
            }
        }
        (offset, ty)
    }
}

impl<T: Clone> LeafTree<T> {
    /// A tree with every leaf set to the same value.
    pub fn filled(ty: Type, value: T) -> LeafTree<T> {
        let count = ty.leaf_count();
        LeafTree {
            ty,
            leaves: vec![value; count],
        }
    }

    /// The induced tree over all paths extending `prefix`.
    pub fn subtree(&self, prefix: &[usize]) -> LeafTree<T> {
        let (offset, sub) = self.locate(prefix);
        LeafTree {
            ty: sub.clone(),
            leaves: self.leaves[offset..offset + sub.leaf_count()].to_vec(),
        }
    }

    /// Replace the subtree at `prefix` with `sub`, which must have exactly
    /// the subtype's shape.
    pub fn replace_subtree(&mut self, prefix: &[usize], sub: &LeafTree<T>) {
        let (offset, sub_ty) = self.locate(prefix);
        assert_eq!(*sub_ty, sub.ty, "replacement subtree shape mismatch");
        self.leaves[offset..offset + sub.leaves.len()].clone_from_slice(&sub.leaves);
    }

    /// Assemble a tuple or array tree from per-child trees in order.
    pub fn from_subtrees(ty: Type, parts: &[LeafTree<T>]) -> LeafTree<T> {
        assert_eq!(
            ty.child_count(),
            parts.len(),
            "from_subtrees part count disagrees with {ty}"
        );
        let mut leaves = Vec::with_capacity(ty.leaf_count());
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(
                *ty.child(i),
                part.ty,
                "from_subtrees part {i} shape mismatch for {ty}"
            );
            leaves.extend(part.leaves.iter().cloned());
        }
        LeafTree { ty, leaves }
    }
}

/// All leaf paths of a type in canonical depth-first order.
pub fn leaf_paths(ty: &Type) -> Vec<Vec<usize>> {
    let mut paths = Vec::with_capacity(ty.leaf_count());
    let mut path = Vec::new();
    collect_paths(ty, &mut path, &mut paths);
    paths
}

fn collect_paths(ty: &Type, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    if ty.is_bits() {
        out.push(path.clone());
        return;
    }
    for i in 0..ty.child_count() {
        path.push(i);
        collect_paths(ty.child(i), path, out);
        path.pop();
    }
}

fn fill<T>(
    ty: &Type,
    path: &mut Vec<usize>,
    out: &mut Vec<T>,
    f: &mut impl FnMut(&[usize], &Type) -> T,
) {
    if ty.is_bits() {
        out.push(f(path, ty));
        return;
    }
    for i in 0..ty.child_count() {
        path.push(i);
        fill(ty.child(i), path, out, f);
        path.pop();
    }
}
