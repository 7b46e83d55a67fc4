/// Union-find over `0..len`, used to close the duplicate relation transitively.
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }

    /// Members grouped by root, each group in ascending index order.
    /// Groups come out ordered by their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; len];
        let mut groups: Vec<Vec<usize>> = vec![];
        for idx in 0..len {
            let root = self.find(idx);
            match slot_of_root[root] {
                Some(slot) => groups[slot].push(idx),
                None => {
                    slot_of_root[root] = Some(groups.len());
                    groups.push(vec![idx]);
                }
            }
        }
        groups
    }
}
