use std::cell::RefCell;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use ndarray::{Array1, Array2};

/// Dense per-node covariate, aligned positionally with the network's node order.
#[derive(Debug, Clone)]
pub struct NodeCovariate {
    names: Vec<String>,
    data: Array1<f64>,
}

impl NodeCovariate {
    pub fn new(names: Vec<String>) -> Self {
        let data = Array1::zeros(names.len());
        Self { names, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.data
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.data.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => bail!("covariate index {index} outside range 0..{}", self.len()),
        }
    }

    /// Assign values by node name; unknown names are skipped.
    pub fn from_pairs<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let lookup: IndexMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();
        for (name, value) in pairs {
            if let Some(&index) = lookup.get(name) {
                self.data[index] = value;
            }
        }
    }

    pub fn subset(&self, indices: &[usize]) -> Result<NodeCovariate> {
        let mut names = Vec::with_capacity(indices.len());
        let mut data = Array1::zeros(indices.len());
        for (position, &index) in indices.iter().enumerate() {
            let name = self
                .names
                .get(index)
                .ok_or_else(|| anyhow!("covariate index {index} outside range 0..{}", self.len()))?;
            names.push(name.clone());
            data[position] = self.data[index];
        }
        Ok(NodeCovariate { names, data })
    }
}

/// Sparse per-edge covariate with a cached dense form; writes invalidate the cache.
#[derive(Debug, Clone)]
pub struct EdgeCovariate {
    names: Vec<String>,
    entries: IndexMap<(usize, usize), f64>,
    cache: RefCell<Option<Arc<Array2<f64>>>>,
}

impl EdgeCovariate {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            entries: IndexMap::new(),
            cache: RefCell::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, source: usize, target: usize) -> f64 {
        self.entries.get(&(source, target)).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, source: usize, target: usize, value: f64) -> Result<()> {
        let n = self.len();
        if source >= n || target >= n {
            bail!("covariate cell ({source}, {target}) outside range 0..{n}");
        }
        if value == 0.0 {
            self.entries.shift_remove(&(source, target));
        } else {
            self.entries.insert((source, target), value);
        }
        self.invalidate();
        Ok(())
    }

    pub fn matrix(&self) -> Arc<Array2<f64>> {
        if let Some(cached) = self.cache.borrow().as_ref() {
            return Arc::clone(cached);
        }
        let n = self.len();
        let mut dense = Array2::zeros((n, n));
        for (&(source, target), &value) in &self.entries {
            dense[[source, target]] = value;
        }
        let dense = Arc::new(dense);
        *self.cache.borrow_mut() = Some(Arc::clone(&dense));
        dense
    }

    pub fn sparse_entries(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.entries.iter().map(|(&cell, &value)| (cell, value))
    }

    pub fn subset(&self, indices: &[usize]) -> Result<EdgeCovariate> {
        let mut names = Vec::with_capacity(indices.len());
        let mut remap: IndexMap<usize, usize> = IndexMap::with_capacity(indices.len());
        for (position, &index) in indices.iter().enumerate() {
            let name = self
                .names
                .get(index)
                .ok_or_else(|| anyhow!("covariate index {index} outside range 0..{}", self.len()))?;
            names.push(name.clone());
            remap.insert(index, position);
        }

        let mut sub = EdgeCovariate::new(names);
        for (&(source, target), &value) in &self.entries {
            if let (Some(&new_source), Some(&new_target)) =
                (remap.get(&source), remap.get(&target))
            {
                sub.entries.insert((new_source, new_target), value);
            }
        }
        Ok(sub)
    }

    /// Fill from a function of index pairs.
    pub fn from_binary_function_ind<F>(&mut self, f: F)
    where
        F: Fn(usize, usize) -> f64,
    {
        let n = self.len();
        for source in 0..n {
            for target in 0..n {
                let value = f(source, target);
                if value != 0.0 {
                    self.entries.insert((source, target), value);
                }
            }
        }
        self.invalidate();
    }

    /// Fill from a function of node-name pairs.
    pub fn from_binary_function_name<F>(&mut self, f: F)
    where
        F: Fn(&str, &str) -> f64,
    {
        let n = self.len();
        for source in 0..n {
            for target in 0..n {
                let value = f(&self.names[source], &self.names[target]);
                if value != 0.0 {
                    self.entries.insert((source, target), value);
                }
            }
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cache.get_mut().take();
    }
}
