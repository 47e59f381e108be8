//! gnbs-benches — programmes GNBS auto-contenus partagés par les benchs.
//!
//! Lancer :
//!   cargo bench -p gnbs-benches --bench vm_hotpath
//!   cargo bench -p gnbs-benches --bench frontend -- --save-baseline front

/// Un petit programme nommé.
#[derive(Clone, Copy, Debug)]
pub struct Micro {
    /// Identifiant criterion.
    pub name: &'static str,
    /// Source GNBS.
    pub src: &'static str,
}

/// Cas « hot path » : pas d'I/O hors un `print` final.
pub const MICROS: &[Micro] = &[
    Micro {
        name: "arith/add_loop",
        src: "
            var acc = 0;
            for (var i = 0; i < 200000; i = i + 1) {
                acc = acc + i;
            }
            print acc;
        ",
    },
    Micro {
        name: "branch/predictable_if",
        src: "
            var x = 0;
            var i = 0;
            while (i < 150000) {
                if (i / 2 * 2 == i) x = x + 3; else x = x - 2;
                i = i + 1;
            }
            print x;
        ",
    },
    Micro {
        name: "calls/call_chain",
        src: "
            function f1(x) { return x + 1; }
            function f2(x) { return f1(x) + 1; }
            function f3(x) { return f2(x) + 1; }
            function f4(x) { return f3(x) + 1; }
            function f5(x) { return f4(x) + 1; }
            var acc = 0;
            for (var i = 0; i < 60000; i = i + 1) acc = acc + f5(i);
            print acc;
        ",
    },
    Micro {
        name: "recursion/fib20",
        src: "
            function fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(20);
        ",
    },
    Micro {
        name: "strings/concat_interned",
        src: "
            var s = \"\";
            for (var i = 0; i < 2000; i = i + 1) s = \"ab\" + \"cd\";
            var t = \"\";
            for (var j = 0; j < 300; j = j + 1) t = t + str(j);
            print s;
        ",
    },
];

/// Source volumineuse pour le frontal : `n` copies d'un bloc varié.
pub fn synthetic_source(n: usize) -> String {
    let block = "
        var a = 1; var b = 2.5; var s = \"texte\";
        function f(x, y) { /* bloc */ return x * y + 1; }
        { var c = a + 3; if (c > 2 and true) print c; else print null; }
        while (a < 10) a = a + 1; // commentaire
        for (var k = 0; k < 3; k = k + 1) print f(k, 2);
    ";
    block.repeat(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_run() {
        for m in MICROS {
            let mut vm = gnbs_vm::Vm::new().with_output(std::io::sink());
            assert!(vm.interpret(m.src).is_ok(), "{} a échoué", m.name);
        }
    }

    #[test]
    fn synthetic_source_compiles() {
        let mut heap = gnbs_core::heap::Heap::new();
        let src = synthetic_source(4);
        let mut compiler = gnbs_compiler::Compiler::default();
        assert!(compiler.compile(&src, &mut heap).is_ok());
        assert!(gnbs_lexer::Scanner::new(&src).count() > 100);
    }
}
